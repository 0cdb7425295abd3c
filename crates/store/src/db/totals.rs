//! Verification and repair of cached order totals.
//!
//! Totals only drift when lines were changed outside
//! [`super::OrderItemRepository`], for example by a bulk load with triggers
//! disabled. Repair uses the same `shop.refresh_order_total` function as the
//! trigger, so it takes the same order row locks.

use sqlx::PgPool;
use tracing::instrument;

use shopkeep_core::{Money, OrderId};

use crate::RepositoryError;
use crate::models::TotalDrift;

const DRIFT_QUERY: &str = r"
    SELECT o.id AS order_id,
           o.total_amount AS stored,
           COALESCE(SUM(i.subtotal), 0)::NUMERIC(12, 2) AS expected
    FROM shop.orders o
    LEFT JOIN shop.order_items i ON i.order_id = o.id
    GROUP BY o.id
    HAVING o.total_amount <> COALESCE(SUM(i.subtotal), 0)
    ORDER BY o.id
";

/// Repository for order total maintenance.
pub struct TotalsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TotalsRepository<'a> {
    /// Create a new totals repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Recompute one order's total from its lines and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn recompute(&self, order_id: OrderId) -> Result<Money, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Money =
            sqlx::query_scalar("SELECT total_amount FROM shop.orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::not_found("orders", order_id))?;

        sqlx::query("SELECT shop.refresh_order_total($1)")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let total: Money = sqlx::query_scalar("SELECT total_amount FROM shop.orders WHERE id = $1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(previous = %previous, total = %total, "Recomputed order total");
        Ok(total)
    }

    /// Orders whose stored total differs from the sum of their lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn verify(&self) -> Result<Vec<TotalDrift>, RepositoryError> {
        let drift = sqlx::query_as::<_, TotalDrift>(DRIFT_QUERY)
            .fetch_all(self.pool)
            .await?;
        if !drift.is_empty() {
            tracing::warn!(drifted = drift.len(), "Order totals out of step with their lines");
        }
        Ok(drift)
    }

    /// Recompute every drifted order in one transaction. Returns what was
    /// repaired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any recomputation fails; no
    /// order is changed in that case.
    #[instrument(skip(self))]
    pub async fn repair_all(&self) -> Result<Vec<TotalDrift>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let drift = sqlx::query_as::<_, TotalDrift>(DRIFT_QUERY)
            .fetch_all(&mut *tx)
            .await?;

        for entry in &drift {
            sqlx::query("SELECT shop.refresh_order_total($1)")
                .bind(entry.order_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        if !drift.is_empty() {
            tracing::warn!(repaired = drift.len(), "Repaired drifted order totals");
        }
        Ok(drift)
    }
}
