//! Order total verification and repair.
//!
//! # Usage
//!
//! ```bash
//! # Exit non-zero if any order total is wrong
//! shopkeep totals verify
//!
//! # Recompute one order
//! shopkeep totals repair --order 42
//!
//! # Recompute every drifted order
//! shopkeep totals repair
//! ```

use shopkeep_core::OrderId;
use shopkeep_store::db::TotalsRepository;

use super::{CommandError, connect};

/// Print drifted orders; fail if there are any.
pub async fn verify() -> Result<(), CommandError> {
    let pool = connect().await?;
    let drift = TotalsRepository::new(&pool).verify().await?;
    pool.close().await;

    if drift.is_empty() {
        tracing::info!("All order totals match their lines");
        return Ok(());
    }

    #[allow(clippy::print_stdout)]
    for entry in &drift {
        println!(
            "order {}: stored {} expected {}",
            entry.order_id, entry.stored, entry.expected
        );
    }
    Err(CommandError::DriftFound(drift.len()))
}

/// Recompute one order's total, or every drifted order when `order` is `None`.
pub async fn repair(order: Option<i32>) -> Result<(), CommandError> {
    let pool = connect().await?;
    let totals = TotalsRepository::new(&pool);

    if let Some(id) = order {
        let order_id = OrderId::new(id);
        let total = totals.recompute(order_id).await?;
        tracing::info!(order_id = %order_id, total = %total, "Order total recomputed");
    } else {
        let repaired = totals.repair_all().await?;
        for entry in &repaired {
            tracing::info!(
                order_id = %entry.order_id,
                from = %entry.stored,
                to = %entry.expected,
                "Order total repaired"
            );
        }
        tracing::info!(count = repaired.len(), "Repair complete");
    }

    pool.close().await;
    Ok(())
}
