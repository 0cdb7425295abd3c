//! Core types for Shopkeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod bounded;
pub mod email;
pub mod id;
pub mod money;
pub mod sku;
pub mod status;

pub use bounded::{Quantity, QuantityError, Rating, RatingError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use sku::{Sku, SkuError};
pub use status::*;
