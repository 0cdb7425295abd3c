//! Order repository for database operations.
//!
//! Orders are created empty with a zero total. Their lines live in
//! [`super::OrderItemRepository`], and their total is never written here.

use sqlx::PgPool;
use tracing::instrument;

use shopkeep_core::{CustomerId, OrderId, OrderStatus};

use crate::RepositoryError;
use crate::models::{NewOrder, Order};

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an empty `pending` order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer or an address
    /// does not exist.
    pub async fn create(&self, input: &NewOrder) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO shop.orders (customer_id, shipping_address_id, billing_address_id)
            VALUES ($1, $2, $3)
            RETURNING id, customer_id, shipping_address_id, billing_address_id,
                      status, total_amount, created_at
            ",
        )
        .bind(input.customer_id)
        .bind(input.shipping_address_id)
        .bind(input.billing_address_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "Created order");
        Ok(order)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, customer_id, shipping_address_id, billing_address_id,
                   status, total_amount, created_at
            FROM shop.orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// A customer's orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, customer_id, shipping_address_id, billing_address_id,
                   status, total_amount, created_at
            FROM shop.orders
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Move an order to a new status.
    ///
    /// The row is locked while the transition is checked, so two concurrent
    /// changes cannot both pass the check against the same old status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::InvalidTransition` if the move is not allowed.
    #[instrument(skip(self), fields(order_id = %id, to = %status))]
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus =
            sqlx::query_scalar("SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::not_found("orders", id))?;

        if !current.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                entity: "order",
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let order = sqlx::query_as::<_, Order>(
            r"
            UPDATE shop.orders
            SET status = $2
            WHERE id = $1
            RETURNING id, customer_id, shipping_address_id, billing_address_id,
                      status, total_amount, created_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;
        tracing::info!(from = %current, "Order status changed");
        Ok(order)
    }

    /// Delete an order with its lines and payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("orders", id));
        }
        tracing::info!(order_id = %id, "Deleted order");
        Ok(())
    }
}
