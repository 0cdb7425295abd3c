//! Shopkeep Store - relational storage for customers, catalog, and orders.
//!
//! Two backends share one set of models and one error type:
//!
//! - [`db`] - `PostgreSQL` repositories over the `shop` schema. Order totals
//!   are maintained by a trigger on `shop.order_items`.
//! - [`memory`] - an embedded engine with the same constraints. Order totals
//!   are recomputed by the item write path inside each unit of work.
//!
//! Either way, an order's `total_amount` equals the sum of its line
//! subtotals (zero with no lines) whenever no item mutation is in flight.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration and text settings
//! - [`error`] - [`RepositoryError`]
//! - [`models`] - Row types and inputs
//! - [`schema`] - Static catalog of tables, keys, and delete actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod schema;

pub use config::{Collation, StoreConfig, TextEncoding, TextSettings};
pub use error::RepositoryError;
pub use memory::{MemoryStore, SharedStore};

use sqlx::PgPool;

/// Apply every pending migration in `crates/store/migrations/`.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails or a previously
/// applied migration has changed.
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    tracing::info!("Running shop migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Shop migrations complete");
    Ok(())
}
