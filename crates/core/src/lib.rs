//! Shopkeep Core - Shared types library.
//!
//! This crate provides the domain types used across all Shopkeep components:
//! - `store` - Schema, migrations, and the order-total consistency mechanism
//! - `cli` - Command-line tools for migrations and total verification
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access.
//! Each type enforces the same rule the matching column `CHECK` constraint
//! enforces, so invalid values are rejected before they reach a table.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, quantities, ratings, emails, SKUs, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
