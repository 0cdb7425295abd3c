//! Order total consistency in the in-memory engine.
//!
//! After every item mutation, each order's total must equal the sum of its
//! line subtotals, and zero when it has no lines.

use rust_decimal::Decimal;

use shopkeep_core::{OrderId, OrderItemKey};
use shopkeep_integration_tests::memory::{seed_order, seed_product};
use shopkeep_integration_tests::{cents, line};
use shopkeep_store::models::{NewOrderItem, OrderItemChanges};
use shopkeep_store::{MemoryStore, RepositoryError, SharedStore};

fn total(store: &MemoryStore, order_id: OrderId) -> Decimal {
    store
        .get_order(order_id)
        .expect("Order should exist")
        .total_amount
        .amount()
}

fn assert_consistent(store: &MemoryStore, orders: &[OrderId]) {
    for &order_id in orders {
        let expected: Decimal = store
            .list_items(order_id)
            .iter()
            .map(|item| item.subtotal.amount())
            .sum();
        assert_eq!(total(store, order_id), expected, "order {order_id} drifted");
    }
    assert!(store.order_total_drift().is_empty());
}

// ============================================================================
// Single-order lifecycle
// ============================================================================

#[test]
fn test_insert_insert_delete_delete() {
    let mut store = MemoryStore::default();
    let order = seed_order(&mut store);
    let tee = seed_product(&mut store, 1999);
    let mug = seed_product(&mut store, 500);

    let first = store
        .add_item(order.order_id, line(tee, 1999))
        .expect("Failed to add first line");
    assert_eq!(total(&store, order.order_id), cents(1999));

    let second = store
        .add_item(order.order_id, line(mug, 500))
        .expect("Failed to add second line");
    assert_eq!(total(&store, order.order_id), cents(2499));

    store.remove_item(first.key()).expect("Failed to remove first line");
    assert_eq!(total(&store, order.order_id), cents(500));

    store.remove_item(second.key()).expect("Failed to remove second line");
    assert_eq!(total(&store, order.order_id), Decimal::ZERO);
}

#[test]
fn test_update_subtotal() {
    let mut store = MemoryStore::default();
    let order = seed_order(&mut store);
    let mug = seed_product(&mut store, 500);
    let item = store
        .add_item(order.order_id, line(mug, 500))
        .expect("Failed to add line");

    store
        .update_item(
            item.key(),
            OrderItemChanges {
                subtotal: Some(cents(1250)),
                ..OrderItemChanges::default()
            },
        )
        .expect("Failed to update line");

    assert_eq!(total(&store, order.order_id), cents(1250));
}

#[test]
fn test_unknown_line_is_not_found() {
    let mut store = MemoryStore::default();
    let order = seed_order(&mut store);
    let key = OrderItemKey::new(order.order_id, 99);

    assert!(matches!(
        store.remove_item(key),
        Err(RepositoryError::NotFound { .. })
    ));
    assert!(matches!(
        store.update_item(key, OrderItemChanges::default()),
        Err(RepositoryError::NotFound { .. })
    ));
}

// ============================================================================
// Cross-order moves
// ============================================================================

#[test]
fn test_move_between_orders() {
    let mut store = MemoryStore::default();
    let a = seed_order(&mut store);
    let b = seed_order(&mut store);
    let tee = seed_product(&mut store, 1000);
    let item = store
        .add_item(a.order_id, line(tee, 1000))
        .expect("Failed to add line");

    let moved = store
        .move_item(item.key(), b.order_id)
        .expect("Failed to move line");

    assert_eq!(moved.order_id, b.order_id);
    assert_eq!(total(&store, a.order_id), Decimal::ZERO);
    assert_eq!(total(&store, b.order_id), cents(1000));
}

#[test]
fn test_move_to_missing_order_changes_nothing() {
    let mut store = MemoryStore::default();
    let a = seed_order(&mut store);
    let tee = seed_product(&mut store, 1000);
    let item = store
        .add_item(a.order_id, line(tee, 1000))
        .expect("Failed to add line");

    let err = store
        .move_item(item.key(), OrderId::new(9999))
        .expect_err("Move to a missing order should fail");

    assert!(matches!(err, RepositoryError::ForeignKey { .. }));
    assert_eq!(store.get_item(item.key()), Some(item));
    assert_eq!(total(&store, a.order_id), cents(1000));
}

// ============================================================================
// Mixed workloads
// ============================================================================

#[test]
fn test_invariant_holds_across_mixed_mutations() {
    let mut store = MemoryStore::default();
    let orders: Vec<OrderId> = (0..3).map(|_| seed_order(&mut store).order_id).collect();
    let product = seed_product(&mut store, 100);

    let mut keys = Vec::new();
    for (i, subtotal) in [150_i64, 275, 999, 1, 4250, 60, 0, 333].into_iter().enumerate() {
        let order_id = orders[i % orders.len()];
        let item = store
            .add_item(order_id, line(product, subtotal))
            .expect("Failed to add line");
        keys.push(item.key());
        assert_consistent(&store, &orders);
    }

    let moved = store
        .move_item(keys[0], orders[2])
        .expect("Failed to move line");
    keys[0] = moved.key();
    assert_consistent(&store, &orders);

    store
        .update_item(
            keys[3],
            OrderItemChanges {
                quantity: Some(3),
                subtotal: Some(cents(3)),
                ..OrderItemChanges::default()
            },
        )
        .expect("Failed to update line");
    assert_consistent(&store, &orders);

    for key in keys.iter().step_by(2) {
        store.remove_item(*key).expect("Failed to remove line");
        assert_consistent(&store, &orders);
    }

    // Rejected writes leave everything as it was.
    let before: Vec<Decimal> = orders.iter().map(|id| total(&store, *id)).collect();
    let rejected = store.add_item(
        orders[1],
        NewOrderItem {
            subtotal: cents(-1),
            ..line(product, 100)
        },
    );
    assert!(matches!(rejected, Err(RepositoryError::Check { .. })));
    let after: Vec<Decimal> = orders.iter().map(|id| total(&store, *id)).collect();
    assert_eq!(before, after);
    assert_consistent(&store, &orders);
}

#[test]
fn test_bulk_import_then_repair_is_noop() {
    let mut store = MemoryStore::default();
    let a = seed_order(&mut store);
    let b = seed_order(&mut store);
    let tee = seed_product(&mut store, 100);

    let lines = (1..=20)
        .map(|i| {
            let order_id = if i % 2 == 0 { a.order_id } else { b.order_id };
            (order_id, line(tee, i * 10))
        })
        .collect();
    store.bulk_import_items(lines).expect("Failed to import lines");

    assert_consistent(&store, &[a.order_id, b.order_id]);
    let repaired = store.repair_totals().expect("Failed to repair totals");
    assert!(repaired.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_mutations_on_shared_orders() {
    let shared = SharedStore::default();
    let (a, b, product) = {
        let mut store = shared.lock().await;
        let a = seed_order(&mut store).order_id;
        let b = seed_order(&mut store).order_id;
        let product = seed_product(&mut store, 100);
        (a, b, product)
    };

    let mut handles = Vec::new();
    for worker in 0..8_i64 {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            for step in 0..10_i64 {
                let mut store = shared.lock().await;
                let (from, to) = if worker % 2 == 0 { (a, b) } else { (b, a) };
                let item = store
                    .add_item(from, line(product, 100 + step))
                    .expect("Failed to add line");
                if step % 3 == 0 {
                    store.move_item(item.key(), to).expect("Failed to move line");
                } else if step % 3 == 1 {
                    store.remove_item(item.key()).expect("Failed to remove line");
                }
            }
        }));
    }
    for handle in handles {
        handle.await.expect("Worker panicked");
    }

    let store = shared.lock().await;
    assert_consistent(&store, &[a, b]);
}
