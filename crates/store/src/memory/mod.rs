//! In-memory implementation of the `shop` schema.
//!
//! [`MemoryStore`] enforces the same keys, check constraints, and delete
//! actions as the migrations, and reports violations with the same
//! constraint names. It has no triggers, so the order total is maintained by
//! the item write path itself: every line insert, update, move, and delete
//! recomputes the affected order totals inside the same unit of work.
//!
//! # Units of work
//!
//! Each public mutation runs against a staged copy of the tables and is
//! committed only if it succeeds, so a failed mutation (including a failed
//! total recomputation) leaves no trace. Tables are copy-on-write: staging
//! shares every table, and only the tables a mutation writes are copied. Mutations take `&mut self`; share a
//! store between tasks through [`SharedStore`], which serializes them.

mod catalog;
mod customers;
mod engagement;
mod orders;
mod tables;

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

use shopkeep_core::{Money, Quantity, Rating};

use crate::RepositoryError;
use crate::config::TextSettings;
use tables::Tables;

/// An embedded store holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    text: TextSettings,
    tables: Tables,
}

impl MemoryStore {
    /// Create an empty store using the given text settings for the lifetime
    /// of the store.
    #[must_use]
    pub fn new(text: TextSettings) -> Self {
        tracing::debug!(?text, "Creating in-memory store");
        Self {
            text,
            tables: Tables::default(),
        }
    }

    /// Text settings fixed at creation.
    #[must_use]
    pub const fn text_settings(&self) -> TextSettings {
        self.text
    }

    /// Run `op` against a staged copy of the tables and commit on success.
    ///
    /// The staged copy shares rows with the live tables until `op` first
    /// writes a table.
    fn write<T>(
        &mut self,
        op: impl FnOnce(&mut Tables, TextSettings) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut staged = self.tables.clone();
        let out = op(&mut staged, self.text)?;
        self.tables = staged;
        Ok(out)
    }
}

/// A cloneable handle to one [`MemoryStore`] shared between tasks.
///
/// Holding the guard serializes every mutation, so two writers touching
/// lines of the same order can never interleave between the aggregate read
/// and the total write.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<MemoryStore>>,
}

impl SharedStore {
    /// Wrap a store for sharing.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Wait for exclusive access to the store.
    pub async fn lock(&self) -> MutexGuard<'_, MemoryStore> {
        self.inner.lock().await
    }
}

// =============================================================================
// Check constraints
// =============================================================================

fn check_money(constraint: &str, value: Decimal) -> Result<Money, RepositoryError> {
    Money::new(value).map_err(|e| RepositoryError::check(constraint, e))
}

fn check_quantity(constraint: &str, value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(value).map_err(|e| RepositoryError::check(constraint, e))
}

fn check_rating(constraint: &str, value: i16) -> Result<Rating, RepositoryError> {
    Rating::new(value).map_err(|e| RepositoryError::check(constraint, e))
}

fn check_non_negative(constraint: &str, value: i32) -> Result<i32, RepositoryError> {
    if value < 0 {
        return Err(RepositoryError::check(
            constraint,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the memory engine's unit tests.

    use rust_decimal::Decimal;

    use shopkeep_core::{AddressId, CustomerId, Email, OrderId, ProductId, Sku};

    use super::MemoryStore;
    use crate::models::{NewAddress, NewCustomer, NewOrder, NewOrderItem, NewProduct};

    pub fn customer(store: &mut MemoryStore, email: &str) -> CustomerId {
        store
            .create_customer(NewCustomer {
                email: Email::parse(email).unwrap_or_else(|e| panic!("{e}")),
                first_name: "Ada".to_owned(),
                last_name: "Lovelace".to_owned(),
                phone: None,
            })
            .map(|c| c.id)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn address(store: &mut MemoryStore, customer_id: CustomerId) -> AddressId {
        store
            .add_address(NewAddress {
                customer_id,
                line1: "1 Analytical Way".to_owned(),
                line2: None,
                city: "London".to_owned(),
                region: None,
                postal_code: "N1 9GU".to_owned(),
                country: "GB".to_owned(),
            })
            .map(|a| a.id)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn product(store: &mut MemoryStore, sku: &str, price_cents: i64) -> ProductId {
        store
            .create_product(NewProduct {
                sku: Sku::parse(sku).unwrap_or_else(|e| panic!("{e}")),
                name: format!("Product {sku}"),
                description: None,
                price: Decimal::new(price_cents, 2),
            })
            .map(|p| p.id)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// A customer with one address and an empty order shipped there.
    pub fn order(store: &mut MemoryStore, email: &str) -> (CustomerId, AddressId, OrderId) {
        let customer_id = customer(store, email);
        let address_id = address(store, customer_id);
        let order_id = store
            .create_order(NewOrder {
                customer_id,
                shipping_address_id: address_id,
                billing_address_id: None,
            })
            .map(|o| o.id)
            .unwrap_or_else(|e| panic!("{e}"));
        (customer_id, address_id, order_id)
    }

    pub fn line(product_id: ProductId, subtotal_cents: i64) -> NewOrderItem {
        NewOrderItem {
            product_id,
            unit_price: Decimal::new(subtotal_cents, 2),
            quantity: 1,
            subtotal: Decimal::new(subtotal_cents, 2),
        }
    }
}
