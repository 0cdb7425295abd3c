//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopkeep migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/store/migrations/` and are embedded into the
//! binary at build time:
//! ```text
//! migrations/
//! ├── 20261015000001_create_customers.sql
//! ├── 20261015000002_create_catalog.sql
//! ├── 20261015000003_create_orders.sql
//! └── ...
//! ```

use super::{CommandError, connect};

/// Run every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    shopkeep_store::migrate(&pool).await?;
    pool.close().await;
    Ok(())
}
