//! Orders, order lines, and payments.
//!
//! Every line mutation recomputes the total of each order it touched before
//! the unit of work commits. A move touches two orders and refreshes both.

use std::collections::BTreeSet;

use chrono::Utc;

use shopkeep_core::{
    CustomerId, Money, OrderId, OrderItemKey, OrderStatus, PaymentId, PaymentStatus,
};

use super::{MemoryStore, check_money, check_quantity};
use crate::RepositoryError;
use crate::models::{
    NewOrder, NewOrderItem, NewPayment, Order, OrderItem, OrderItemChanges, Payment, TotalDrift,
};

impl MemoryStore {
    // =========================================================================
    // Orders
    // =========================================================================

    /// Create an empty `pending` order with a zero total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer or either
    /// address does not exist.
    pub fn create_order(&mut self, input: NewOrder) -> Result<Order, RepositoryError> {
        let order = self.write(|t, _| {
            t.require_customer(input.customer_id, "orders_customer_id_fkey")?;
            t.require_address(input.shipping_address_id, "orders_shipping_address_id_fkey")?;
            if let Some(billing) = input.billing_address_id {
                t.require_address(billing, "orders_billing_address_id_fkey")?;
            }

            let order = Order {
                id: t.seq.orders(),
                customer_id: input.customer_id,
                shipping_address_id: input.shipping_address_id,
                billing_address_id: input.billing_address_id,
                status: OrderStatus::Pending,
                total_amount: Money::ZERO,
                created_at: Utc::now(),
            };
            t.orders.insert(order.id, order.clone());
            Ok(order)
        })?;
        tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "Created order");
        Ok(order)
    }

    /// Get an order by ID.
    #[must_use]
    pub fn get_order(&self, id: OrderId) -> Option<Order> {
        self.tables.orders.get(&id).cloned()
    }

    /// A customer's orders, oldest first.
    #[must_use]
    pub fn list_orders_for_customer(&self, customer_id: CustomerId) -> Vec<Order> {
        self.tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect()
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order and
    /// `RepositoryError::InvalidTransition` if the move is not allowed.
    pub fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.write(|t, _| {
            let order = t
                .orders
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::not_found("orders", id))?;
            if !order.status.can_transition_to(status) {
                return Err(RepositoryError::InvalidTransition {
                    entity: "order",
                    from: order.status.to_string(),
                    to: status.to_string(),
                });
            }
            order.status = status;
            Ok(order.clone())
        })
    }

    /// Delete an order together with its lines and payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub fn delete_order(&mut self, id: OrderId) -> Result<Order, RepositoryError> {
        let deleted = self.write(|t, _| t.delete_order(id))?;
        tracing::info!(order_id = %id, "Deleted order");
        Ok(deleted)
    }

    // =========================================================================
    // Order lines
    // =========================================================================

    /// Add a line to an order and refresh the order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a non-positive quantity or a
    /// negative amount, and `RepositoryError::ForeignKey` for a missing order
    /// or product. Nothing is applied on error.
    pub fn add_item(
        &mut self,
        order_id: OrderId,
        input: NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        self.write(|t, _| {
            t.require_order(order_id, "order_items_order_id_fkey")?;
            t.require_product(input.product_id, "order_items_product_id_fkey")?;
            let item = OrderItem {
                order_id,
                line_no: 0,
                product_id: input.product_id,
                unit_price: check_money("order_items_unit_price_check", input.unit_price)?,
                quantity: check_quantity("order_items_quantity_check", input.quantity)?,
                subtotal: check_money("order_items_subtotal_check", input.subtotal)?,
            };
            let item = OrderItem {
                line_no: t.allocate_line_no(order_id),
                ..item
            };
            t.order_items.insert(item.key(), item.clone());
            t.refresh_order_total(order_id)?;
            Ok(item)
        })
    }

    /// Add many lines in one unit of work.
    ///
    /// Each touched order is recomputed once after all lines are in place.
    /// Any rejected line rejects the whole batch.
    ///
    /// # Errors
    ///
    /// Same as [`MemoryStore::add_item`], for any line of the batch.
    pub fn bulk_import_items(
        &mut self,
        lines: Vec<(OrderId, NewOrderItem)>,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let count = lines.len();
        let items = self.write(|t, _| {
            let mut touched = BTreeSet::new();
            let mut items = Vec::with_capacity(lines.len());
            for (order_id, input) in lines {
                t.require_order(order_id, "order_items_order_id_fkey")?;
                t.require_product(input.product_id, "order_items_product_id_fkey")?;
                let unit_price = check_money("order_items_unit_price_check", input.unit_price)?;
                let quantity = check_quantity("order_items_quantity_check", input.quantity)?;
                let subtotal = check_money("order_items_subtotal_check", input.subtotal)?;
                let item = OrderItem {
                    order_id,
                    line_no: t.allocate_line_no(order_id),
                    product_id: input.product_id,
                    unit_price,
                    quantity,
                    subtotal,
                };
                t.order_items.insert(item.key(), item.clone());
                touched.insert(order_id);
                items.push(item);
            }
            for order_id in touched {
                t.refresh_order_total(order_id)?;
            }
            Ok(items)
        })?;
        tracing::info!(count, "Imported order lines");
        Ok(items)
    }

    /// Get one line.
    #[must_use]
    pub fn get_item(&self, key: OrderItemKey) -> Option<OrderItem> {
        self.tables.order_items.get(&key).cloned()
    }

    /// Lines of an order in line number order.
    #[must_use]
    pub fn list_items(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.tables.items_of(order_id).cloned().collect()
    }

    /// Change columns of a line within its order and refresh the order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown line, plus the
    /// errors of [`MemoryStore::add_item`] for the new values.
    pub fn update_item(
        &mut self,
        key: OrderItemKey,
        changes: OrderItemChanges,
    ) -> Result<OrderItem, RepositoryError> {
        self.write(|t, _| {
            let mut item = t
                .order_items
                .get(&key)
                .cloned()
                .ok_or_else(|| RepositoryError::not_found("order_items", key))?;
            if let Some(product_id) = changes.product_id {
                t.require_product(product_id, "order_items_product_id_fkey")?;
                item.product_id = product_id;
            }
            if let Some(unit_price) = changes.unit_price {
                item.unit_price = check_money("order_items_unit_price_check", unit_price)?;
            }
            if let Some(quantity) = changes.quantity {
                item.quantity = check_quantity("order_items_quantity_check", quantity)?;
            }
            if let Some(subtotal) = changes.subtotal {
                item.subtotal = check_money("order_items_subtotal_check", subtotal)?;
            }
            t.order_items.insert(key, item.clone());
            t.refresh_order_total(key.order_id)?;
            Ok(item)
        })
    }

    /// Reassign a line to another order.
    ///
    /// The line gets the next line number of the target order. Both the
    /// source and the target totals are refreshed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown line and
    /// `RepositoryError::ForeignKey` for a missing target order.
    pub fn move_item(
        &mut self,
        key: OrderItemKey,
        target: OrderId,
    ) -> Result<OrderItem, RepositoryError> {
        if key.order_id == target {
            return self
                .get_item(key)
                .ok_or_else(|| RepositoryError::not_found("order_items", key));
        }
        let moved = self.write(|t, _| {
            t.require_order(target, "order_items_order_id_fkey")?;
            let item = t
                .order_items
                .remove(&key)
                .ok_or_else(|| RepositoryError::not_found("order_items", key))?;
            let item = OrderItem {
                order_id: target,
                line_no: t.allocate_line_no(target),
                ..item
            };
            t.order_items.insert(item.key(), item.clone());
            t.refresh_order_total(key.order_id)?;
            t.refresh_order_total(target)?;
            Ok(item)
        })?;
        tracing::info!(from = %key, to = %moved.key(), "Moved order line");
        Ok(moved)
    }

    /// Remove a line and refresh the order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown line.
    pub fn remove_item(&mut self, key: OrderItemKey) -> Result<OrderItem, RepositoryError> {
        self.write(|t, _| {
            let item = t
                .order_items
                .remove(&key)
                .ok_or_else(|| RepositoryError::not_found("order_items", key))?;
            t.refresh_order_total(key.order_id)?;
            Ok(item)
        })
    }

    // =========================================================================
    // Total verification
    // =========================================================================

    /// Orders whose stored total differs from the sum of their lines.
    ///
    /// Always empty unless the tables were changed outside the item write
    /// path.
    #[must_use]
    pub fn order_total_drift(&self) -> Vec<TotalDrift> {
        self.tables
            .orders
            .values()
            .filter_map(|order| {
                let expected = Money::new(self.tables.sum_subtotals(order.id)).ok()?;
                (expected != order.total_amount).then_some(TotalDrift {
                    order_id: order.id,
                    stored: order.total_amount,
                    expected,
                })
            })
            .collect()
    }

    /// Recompute every order total. Returns the orders that changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` if some order's lines sum past the
    /// largest storable total; no order is changed in that case.
    pub fn repair_totals(&mut self) -> Result<Vec<TotalDrift>, RepositoryError> {
        let drifted = self.order_total_drift();
        self.write(|t, _| {
            let ids: Vec<OrderId> = t.orders.keys().copied().collect();
            for id in ids {
                t.refresh_order_total(id)?;
            }
            Ok(())
        })?;
        if !drifted.is_empty() {
            tracing::warn!(repaired = drifted.len(), "Repaired drifted order totals");
        }
        Ok(drifted)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Record an `initiated` payment against an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a negative amount,
    /// `RepositoryError::ForeignKey` for a missing order, and
    /// `RepositoryError::Conflict` for a reused provider transaction ID.
    pub fn record_payment(&mut self, input: NewPayment) -> Result<Payment, RepositoryError> {
        self.write(|t, _| {
            let amount = check_money("payments_amount_check", input.amount)?;
            t.require_order(input.order_id, "payments_order_id_fkey")?;
            let txn = input.provider_txn_id.as_deref();
            if txn.is_some() && t.payments.values().any(|p| p.provider_txn_id.as_deref() == txn) {
                return Err(RepositoryError::conflict("payments_provider_txn_id_key"));
            }

            let payment = Payment {
                id: t.seq.payments(),
                order_id: input.order_id,
                amount,
                method: input.method,
                status: PaymentStatus::Initiated,
                provider_txn_id: input.provider_txn_id,
                created_at: Utc::now(),
            };
            t.payments.insert(payment.id, payment.clone());
            Ok(payment)
        })
    }

    /// Move a payment to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown payment and
    /// `RepositoryError::InvalidTransition` if the move is not allowed.
    pub fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        self.write(|t, _| {
            let payment = t
                .payments
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::not_found("payments", id))?;
            if !payment.status.can_transition_to(status) {
                return Err(RepositoryError::InvalidTransition {
                    entity: "payment",
                    from: payment.status.to_string(),
                    to: status.to_string(),
                });
            }
            payment.status = status;
            Ok(payment.clone())
        })
    }

    /// Payments recorded against an order.
    #[must_use]
    pub fn list_payments(&self, order_id: OrderId) -> Vec<Payment> {
        self.tables
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::memory::SharedStore;
    use crate::memory::test_support::{line, order, product};

    fn total(store: &MemoryStore, id: OrderId) -> Decimal {
        store.get_order(id).unwrap().total_amount.amount()
    }

    fn cents(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    #[test]
    fn test_new_order_starts_pending_at_zero() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let created = store.get_order(id).unwrap();
        assert_eq!(created.status, OrderStatus::Pending);
        assert!(created.total_amount.is_zero());
    }

    #[test]
    fn test_total_follows_insert_and_delete() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1999);
        let mug = product(&mut store, "MUG-1", 500);

        let first = store.add_item(id, line(tee, 1999)).unwrap();
        assert_eq!(total(&store, id), cents(1999));

        let second = store.add_item(id, line(mug, 500)).unwrap();
        assert_eq!(total(&store, id), cents(2499));

        store.remove_item(first.key()).unwrap();
        assert_eq!(total(&store, id), cents(500));

        store.remove_item(second.key()).unwrap();
        assert_eq!(total(&store, id), Decimal::ZERO);
        assert!(store.list_items(id).is_empty());
    }

    #[test]
    fn test_item_write_copies_only_touched_tables() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1999);
        let before = store.tables.clone();

        store.add_item(id, line(tee, 1999)).unwrap();

        assert!(store.tables.customers.shares_rows_with(&before.customers));
        assert!(store.tables.products.shares_rows_with(&before.products));
        assert!(!store.tables.order_items.shares_rows_with(&before.order_items));
        assert!(!store.tables.orders.shares_rows_with(&before.orders));

        let before = store.tables.clone();
        let rejected = store.add_item(
            id,
            NewOrderItem {
                quantity: 0,
                ..line(tee, 1999)
            },
        );
        assert!(rejected.is_err());
        assert!(store.tables.order_items.shares_rows_with(&before.order_items));
        assert!(store.tables.orders.shares_rows_with(&before.orders));
    }

    #[test]
    fn test_total_follows_update() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let mug = product(&mut store, "MUG-1", 500);
        let item = store.add_item(id, line(mug, 500)).unwrap();

        let updated = store
            .update_item(
                item.key(),
                OrderItemChanges {
                    quantity: Some(2),
                    subtotal: Some(cents(1250)),
                    ..OrderItemChanges::default()
                },
            )
            .unwrap();

        assert_eq!(updated.quantity.get(), 2);
        assert_eq!(total(&store, id), cents(1250));
    }

    #[test]
    fn test_move_refreshes_both_orders() {
        let mut store = MemoryStore::default();
        let (_, _, a) = order(&mut store, "a@example.com");
        let (_, _, b) = order(&mut store, "b@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        let item = store.add_item(a, line(tee, 1000)).unwrap();
        assert_eq!(total(&store, a), cents(1000));
        assert_eq!(total(&store, b), Decimal::ZERO);

        let moved = store.move_item(item.key(), b).unwrap();

        assert_eq!(moved.order_id, b);
        assert_eq!(total(&store, a), Decimal::ZERO);
        assert_eq!(total(&store, b), cents(1000));
        assert!(store.get_item(item.key()).is_none());
    }

    #[test]
    fn test_line_numbers_not_reused() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        let first = store.add_item(id, line(tee, 1000)).unwrap();
        store.remove_item(first.key()).unwrap();
        let second = store.add_item(id, line(tee, 1000)).unwrap();
        assert_eq!(first.line_no, 1);
        assert_eq!(second.line_no, 2);
    }

    #[test]
    fn test_zero_quantity_rejected_without_side_effects() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        store.add_item(id, line(tee, 1000)).unwrap();

        let err = store
            .add_item(
                id,
                NewOrderItem {
                    quantity: 0,
                    ..line(tee, 700)
                },
            )
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Check { ref constraint, .. } if constraint == "order_items_quantity_check"));
        assert_eq!(store.list_items(id).len(), 1);
        assert_eq!(total(&store, id), cents(1000));
    }

    #[test]
    fn test_item_requires_order_and_product() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);

        let err = store.add_item(OrderId::new(404), line(tee, 100)).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey { ref constraint } if constraint == "order_items_order_id_fkey"));

        let missing = shopkeep_core::ProductId::new(404);
        let err = store.add_item(id, line(missing, 100)).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey { ref constraint } if constraint == "order_items_product_id_fkey"));
    }

    #[test]
    fn test_total_overflow_rolls_back_line() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        let near_max = Money::MAX - cents(1);
        store
            .add_item(
                id,
                NewOrderItem {
                    product_id: tee,
                    unit_price: near_max,
                    quantity: 1,
                    subtotal: near_max,
                },
            )
            .unwrap();

        let err = store.add_item(id, line(tee, 100)).unwrap_err();

        assert!(matches!(err, RepositoryError::Check { ref constraint, .. } if constraint == "orders_total_amount_check"));
        assert_eq!(store.list_items(id).len(), 1);
        assert_eq!(total(&store, id), near_max);
    }

    #[test]
    fn test_bulk_import_recomputes_each_order() {
        let mut store = MemoryStore::default();
        let (_, _, a) = order(&mut store, "a@example.com");
        let (_, _, b) = order(&mut store, "b@example.com");
        let tee = product(&mut store, "TEE-1", 1000);

        let items = store
            .bulk_import_items(vec![
                (a, line(tee, 1000)),
                (b, line(tee, 250)),
                (a, line(tee, 199)),
            ])
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(total(&store, a), cents(1199));
        assert_eq!(total(&store, b), cents(250));

        let err = store
            .bulk_import_items(vec![(a, line(tee, 100)), (OrderId::new(404), line(tee, 1))])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey { .. }));
        assert_eq!(store.list_items(a).len(), 2);
    }

    #[test]
    fn test_drift_detected_and_repaired() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        store.add_item(id, line(tee, 1000)).unwrap();
        assert!(store.order_total_drift().is_empty());

        // Bypass the item write path.
        store.tables.orders.get_mut(&id).unwrap().total_amount = Money::from_cents(1).unwrap();

        let drift = store.order_total_drift();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].expected.amount(), cents(1000));

        let repaired = store.repair_totals().unwrap();
        assert_eq!(repaired, drift);
        assert!(store.order_total_drift().is_empty());
        assert_eq!(total(&store, id), cents(1000));
    }

    #[test]
    fn test_delete_order_cascades_lines_and_payments() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        let item = store.add_item(id, line(tee, 1000)).unwrap();
        store
            .record_payment(NewPayment {
                order_id: id,
                amount: cents(1000),
                method: "card".to_owned(),
                provider_txn_id: None,
            })
            .unwrap();

        store.delete_order(id).unwrap();

        assert!(store.get_item(item.key()).is_none());
        assert!(store.list_payments(id).is_empty());
        // The product is no longer referenced.
        assert!(store.delete_product(tee).is_ok());
    }

    #[test]
    fn test_order_status_transitions() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");

        store.set_order_status(id, OrderStatus::Paid).unwrap();
        store.set_order_status(id, OrderStatus::Shipped).unwrap();
        let err = store.set_order_status(id, OrderStatus::Pending).unwrap_err();

        assert!(matches!(err, RepositoryError::InvalidTransition { entity: "order", .. }));
        assert_eq!(store.get_order(id).unwrap().status, OrderStatus::Shipped);
    }

    #[test]
    fn test_payment_rules() {
        let mut store = MemoryStore::default();
        let (_, _, id) = order(&mut store, "a@example.com");
        let payment = store
            .record_payment(NewPayment {
                order_id: id,
                amount: cents(500),
                method: "card".to_owned(),
                provider_txn_id: Some("txn_1".to_owned()),
            })
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Initiated);

        let err = store
            .record_payment(NewPayment {
                order_id: id,
                amount: cents(500),
                method: "card".to_owned(),
                provider_txn_id: Some("txn_1".to_owned()),
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        store
            .set_payment_status(payment.id, PaymentStatus::Captured)
            .unwrap();
        let err = store
            .set_payment_status(payment.id, PaymentStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidTransition { entity: "payment", .. }));
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_total_consistent() {
        let shared = SharedStore::default();
        let (id, tee) = {
            let mut store = shared.lock().await;
            let (_, _, id) = order(&mut store, "a@example.com");
            let tee = product(&mut store, "TEE-1", 100);
            (id, tee)
        };

        let mut handles = Vec::new();
        for _ in 0..16 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..8 {
                    let mut store = shared.lock().await;
                    store.add_item(id, line(tee, 100)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let store = shared.lock().await;
        assert_eq!(store.list_items(id).len(), 128);
        assert_eq!(total(&store, id), cents(12_800));
        assert!(store.order_total_drift().is_empty());
    }
}
