//! Order line repository. This is the only write path for `shop.order_items`.
//!
//! Every statement that inserts, updates, or deletes a line fires the
//! `order_items_refresh_total` trigger, which recomputes the affected order
//! totals from scratch inside the same transaction. A failed recomputation
//! aborts the statement, so a line change and its total change commit or
//! roll back together.
//!
//! # Locking
//!
//! Every method locks the order row before it touches a line, which is the
//! same order the trigger locks in. Adding, updating, or removing a line
//! locks its own order. A move locks both orders in ascending ID order. No
//! two item writes can therefore hold a line while waiting on its order.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use shopkeep_core::{OrderId, OrderItemKey};

use crate::RepositoryError;
use crate::models::{NewOrderItem, OrderItem, OrderItemChanges};

/// Repository for order lines.
pub struct OrderItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderItemRepository<'a> {
    /// Create a new order line repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a line to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the order or product does not
    /// exist. Returns `RepositoryError::Check` for a non-positive quantity or
    /// a negative amount.
    #[instrument(skip(self, input), fields(order_id = %order_id, product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        order_id: OrderId,
        input: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let line_no: i32 = sqlx::query_scalar(
            r"
            UPDATE shop.orders
            SET next_line_no = next_line_no + 1
            WHERE id = $1
            RETURNING next_line_no - 1
            ",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::foreign_key("order_items_order_id_fkey"))?;

        let item = sqlx::query_as::<_, OrderItem>(
            r"
            INSERT INTO shop.order_items
                (order_id, line_no, product_id, unit_price, quantity, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING order_id, line_no, product_id, unit_price, quantity, subtotal
            ",
        )
        .bind(order_id)
        .bind(line_no)
        .bind(input.product_id)
        .bind(input.unit_price)
        .bind(input.quantity)
        .bind(input.subtotal)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;
        tracing::debug!(line_no, "Added order line");
        Ok(item)
    }

    /// Change columns of a line within its order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist, and
    /// the errors of [`Self::add_item`] for the new values.
    #[instrument(skip(self, changes), fields(item = %key))]
    pub async fn update_item(
        &self,
        key: OrderItemKey,
        changes: &OrderItemChanges,
    ) -> Result<OrderItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_order(&mut *tx, key).await?;

        let item = sqlx::query_as::<_, OrderItem>(
            r"
            UPDATE shop.order_items
            SET product_id = COALESCE($3, product_id),
                unit_price = COALESCE($4, unit_price),
                quantity = COALESCE($5, quantity),
                subtotal = COALESCE($6, subtotal)
            WHERE order_id = $1 AND line_no = $2
            RETURNING order_id, line_no, product_id, unit_price, quantity, subtotal
            ",
        )
        .bind(key.order_id)
        .bind(key.line_no)
        .bind(changes.product_id)
        .bind(changes.unit_price)
        .bind(changes.quantity)
        .bind(changes.subtotal)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or_else(|| RepositoryError::not_found("order_items", key))?;

        tx.commit().await?;
        Ok(item)
    }

    /// Reassign a line to another order, under the target's next line number.
    ///
    /// The trigger refreshes both the source and the target totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the target order does not
    /// exist and `RepositoryError::NotFound` if the line does not.
    #[instrument(skip(self), fields(item = %key, target = %target))]
    pub async fn move_item(
        &self,
        key: OrderItemKey,
        target: OrderId,
    ) -> Result<OrderItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ids = vec![key.order_id.as_i32(), target.as_i32()];
        let locked: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM shop.orders WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        if !locked.contains(&target.as_i32()) {
            return Err(RepositoryError::foreign_key("order_items_order_id_fkey"));
        }
        if !locked.contains(&key.order_id.as_i32()) {
            return Err(RepositoryError::not_found("order_items", key));
        }

        let item = if key.order_id == target {
            sqlx::query_as::<_, OrderItem>(
                r"
                SELECT order_id, line_no, product_id, unit_price, quantity, subtotal
                FROM shop.order_items
                WHERE order_id = $1 AND line_no = $2
                ",
            )
            .bind(key.order_id)
            .bind(key.line_no)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            let line_no: i32 = sqlx::query_scalar(
                r"
                UPDATE shop.orders
                SET next_line_no = next_line_no + 1
                WHERE id = $1
                RETURNING next_line_no - 1
                ",
            )
            .bind(target)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query_as::<_, OrderItem>(
                r"
                UPDATE shop.order_items
                SET order_id = $3, line_no = $4
                WHERE order_id = $1 AND line_no = $2
                RETURNING order_id, line_no, product_id, unit_price, quantity, subtotal
                ",
            )
            .bind(key.order_id)
            .bind(key.line_no)
            .bind(target)
            .bind(line_no)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?
        }
        .ok_or_else(|| RepositoryError::not_found("order_items", key))?;

        tx.commit().await?;
        tracing::info!(to = %item.key(), "Moved order line");
        Ok(item)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    #[instrument(skip(self), fields(item = %key))]
    pub async fn remove_item(&self, key: OrderItemKey) -> Result<OrderItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_order(&mut *tx, key).await?;

        let item = sqlx::query_as::<_, OrderItem>(
            r"
            DELETE FROM shop.order_items
            WHERE order_id = $1 AND line_no = $2
            RETURNING order_id, line_no, product_id, unit_price, quantity, subtotal
            ",
        )
        .bind(key.order_id)
        .bind(key.line_no)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from_delete)?
        .ok_or_else(|| RepositoryError::not_found("order_items", key))?;

        tx.commit().await?;
        Ok(item)
    }

    /// Lines of an order in line number order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT order_id, line_no, product_id, unit_price, quantity, subtotal
            FROM shop.order_items
            WHERE order_id = $1
            ORDER BY line_no
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}

/// Lock the order owning `key`. A missing order means a missing line.
async fn lock_order(conn: &mut PgConnection, key: OrderItemKey) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM shop.orders WHERE id = $1 FOR UPDATE")
        .bind(key.order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("order_items", key))?;
    Ok(())
}
