//! Command implementations.

pub mod migrate;
pub mod schema;
pub mod totals;

use shopkeep_store::config::ConfigError;
use shopkeep_store::{RepositoryError, StoreConfig};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// `totals verify` found orders whose total is wrong.
    #[error("{0} order total(s) drifted; run `shopkeep totals repair`")]
    DriftFound(usize),
}

/// Load configuration from the environment and connect.
async fn connect() -> Result<PgPool, CommandError> {
    let config = StoreConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = shopkeep_store::db::create_pool(&config).await?;
    Ok(pool)
}
