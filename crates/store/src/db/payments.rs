//! Payment repository for database operations.

use sqlx::PgPool;

use shopkeep_core::{OrderId, PaymentId, PaymentStatus};

use crate::RepositoryError;
use crate::models::{NewPayment, Payment};

/// Repository for payments.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an `initiated` payment against an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a negative amount,
    /// `RepositoryError::ForeignKey` for a missing order, and
    /// `RepositoryError::Conflict` for a reused provider transaction ID.
    pub async fn record(&self, input: &NewPayment) -> Result<Payment, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            INSERT INTO shop.payments (order_id, amount, method, provider_txn_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, amount, method, status, provider_txn_id, created_at
            ",
        )
        .bind(input.order_id)
        .bind(input.amount)
        .bind(&input.method)
        .bind(&input.provider_txn_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        tracing::info!(payment_id = %payment.id, order_id = %payment.order_id, "Recorded payment");
        Ok(payment)
    }

    /// Move a payment to a new status, checked under a row lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment does not exist.
    /// Returns `RepositoryError::InvalidTransition` if the move is not allowed.
    pub async fn set_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: PaymentStatus =
            sqlx::query_scalar("SELECT status FROM shop.payments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::not_found("payments", id))?;

        if !current.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                entity: "payment",
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let payment = sqlx::query_as::<_, Payment>(
            r"
            UPDATE shop.payments
            SET status = $2
            WHERE id = $1
            RETURNING id, order_id, amount, method, status, provider_txn_id, created_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Payments recorded against an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, amount, method, status, provider_txn_id, created_at
            FROM shop.payments
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(payments)
    }
}
