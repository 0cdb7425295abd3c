//! Database operations for the `shop` `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `customers`, `addresses` - Accounts and postal addresses
//! - `categories`, `products`, `product_categories` - Catalog
//! - `suppliers`, `inventory` - Stock levels
//! - `orders`, `order_items`, `payments` - Orders and money
//! - `reviews`, `wishlists`, `wishlist_items` - Engagement
//! - `change_log` - Append-only audit trail
//!
//! # Order totals
//!
//! `orders.total_amount` is written only by the `order_items_refresh_total`
//! trigger, which recomputes the sum of the affected orders' subtotals inside
//! the statement that changed the lines. Lines must only be changed through
//! [`OrderItemRepository`]; use [`TotalsRepository`] to detect and repair
//! drift after anything bypassed it (bulk loads with triggers disabled,
//! manual edits).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/store/migrations/` and run via:
//! ```bash
//! cargo run -p shopkeep-cli -- migrate
//! ```

pub mod catalog;
pub mod change_log;
pub mod customers;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod totals;
pub mod wishlists;

use std::str::FromStr;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub use catalog::CatalogRepository;
pub use change_log::ChangeLogRepository;
pub use customers::CustomerRepository;
pub use order_items::OrderItemRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;
pub use reviews::ReviewRepository;
pub use totals::TotalsRepository;
pub use wishlists::WishlistRepository;

use crate::config::{Collation, StoreConfig};

/// Create a `PostgreSQL` connection pool from store configuration.
///
/// The database's encoding and the case-insensitive unique indexes are fixed
/// by the database and the migrations; a mismatch with `config.text` is
/// logged, not corrected.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(config: &StoreConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(config.database_url.expose_secret())?
        .application_name("shopkeep");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    let server_encoding: String = sqlx::query_scalar("SHOW server_encoding")
        .fetch_one(&pool)
        .await?;
    if !server_encoding.eq_ignore_ascii_case(config.text.encoding.as_pg_name()) {
        tracing::warn!(
            expected = config.text.encoding.as_pg_name(),
            actual = %server_encoding,
            "Database encoding differs from configured text encoding"
        );
    }
    if config.text.collation == Collation::Binary {
        tracing::warn!("Binary collation requested; PostgreSQL unique keys stay case-insensitive");
    }

    tracing::debug!(
        max_connections = config.max_connections,
        encoding = %server_encoding,
        "Connected to database"
    );
    Ok(pool)
}
