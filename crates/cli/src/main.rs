//! Shopkeep CLI - Database migrations and order total maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopkeep migrate
//!
//! # Show tables, foreign keys, and delete actions
//! shopkeep schema
//!
//! # List orders whose total disagrees with their lines
//! shopkeep totals verify
//!
//! # Recompute one order, or every drifted order
//! shopkeep totals repair --order 42
//! shopkeep totals repair
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `schema` - Describe the `shop` schema
//! - `totals verify` / `totals repair` - Check and fix cached order totals
//!
//! # Logging
//!
//! `RUST_LOG` overrides the default `shopkeep=info` filter. Set
//! `SHOPKEEP_LOG_JSON=1` for JSON log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "shopkeep")]
#[command(author, version, about = "Shopkeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Show tables with their foreign keys and delete actions
    Schema,
    /// Check or repair cached order totals
    Totals {
        #[command(subcommand)]
        action: TotalsAction,
    },
}

#[derive(Subcommand)]
enum TotalsAction {
    /// List orders whose total differs from the sum of their lines
    Verify,
    /// Recompute order totals from their lines
    Repair {
        /// Only recompute this order
        #[arg(short, long)]
        order: Option<i32>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopkeep=info,shopkeep_store=info".into());

    let json = std::env::var("SHOPKEEP_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Schema => {
            commands::schema::print();
            Ok(())
        }
        Commands::Totals { action } => match action {
            TotalsAction::Verify => commands::totals::verify().await,
            TotalsAction::Repair { order } => commands::totals::repair(order).await,
        },
    }
}
