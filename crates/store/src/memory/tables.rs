//! Row storage and referential actions for the in-memory engine.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use rust_decimal::Decimal;

use shopkeep_core::{
    AddressId, CategoryId, ChangeLogId, CustomerId, InventoryId, Money, OrderId, OrderItemKey,
    PaymentId, ProductId, ReviewId, SupplierId, WishlistId,
};

use crate::RepositoryError;
use crate::models::{
    Address, Category, ChangeLogEntry, Customer, Inventory, Order, OrderItem, Payment, Product,
    Review, Supplier, Wishlist, WishlistItem,
};

/// Next value of each `SERIAL` column.
#[derive(Debug, Clone, Default)]
pub(super) struct Sequences {
    customers: i32,
    addresses: i32,
    categories: i32,
    products: i32,
    suppliers: i32,
    inventory: i32,
    orders: i32,
    payments: i32,
    reviews: i32,
    wishlists: i32,
    change_log: i32,
}

macro_rules! next_id {
    ($($field:ident => $ty:ident),+ $(,)?) => {
        impl Sequences {
            $(
                pub(super) fn $field(&mut self) -> $ty {
                    self.$field += 1;
                    $ty::new(self.$field)
                }
            )+
        }
    };
}

next_id!(
    customers => CustomerId,
    addresses => AddressId,
    categories => CategoryId,
    products => ProductId,
    suppliers => SupplierId,
    inventory => InventoryId,
    orders => OrderId,
    payments => PaymentId,
    reviews => ReviewId,
    wishlists => WishlistId,
    change_log => ChangeLogId,
);

/// One table, shared between the live tables and a staged copy until the
/// staged copy first writes to it.
///
/// Cloning is a reference count bump. The first mutable access after a clone
/// copies this table only, so a unit of work pays for the tables it touches.
#[derive(Debug, Default)]
pub(super) struct CopyOnWrite<T>(Arc<T>);

impl<T> Clone for CopyOnWrite<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> CopyOnWrite<T> {
    /// Whether both handles still point at the same rows.
    #[cfg(test)]
    pub fn shares_rows_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Deref for CopyOnWrite<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Clone> DerefMut for CopyOnWrite<T> {
    fn deref_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.0)
    }
}

type Table<K, V> = CopyOnWrite<BTreeMap<K, V>>;

/// Every table of the `shop` schema.
#[derive(Debug, Clone, Default)]
pub(super) struct Tables {
    pub seq: Sequences,
    pub customers: Table<CustomerId, Customer>,
    pub addresses: Table<AddressId, Address>,
    pub categories: Table<CategoryId, Category>,
    pub products: Table<ProductId, Product>,
    pub product_categories: CopyOnWrite<BTreeSet<(ProductId, CategoryId)>>,
    pub suppliers: Table<SupplierId, Supplier>,
    pub inventory: Table<InventoryId, Inventory>,
    pub orders: Table<OrderId, Order>,
    /// Next line number per order. Never decreases, so keys are not reused.
    pub next_line_no: Table<OrderId, i32>,
    pub order_items: Table<OrderItemKey, OrderItem>,
    pub payments: Table<PaymentId, Payment>,
    pub reviews: Table<ReviewId, Review>,
    pub wishlists: Table<WishlistId, Wishlist>,
    pub wishlist_items: Table<(WishlistId, ProductId), WishlistItem>,
    pub change_log: CopyOnWrite<Vec<ChangeLogEntry>>,
}

impl Tables {
    // =========================================================================
    // Lookups that raise foreign key violations
    // =========================================================================

    pub fn require_customer(&self, id: CustomerId, fk: &str) -> Result<&Customer, RepositoryError> {
        self.customers
            .get(&id)
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    pub fn require_address(&self, id: AddressId, fk: &str) -> Result<&Address, RepositoryError> {
        self.addresses
            .get(&id)
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    pub fn require_category(&self, id: CategoryId, fk: &str) -> Result<(), RepositoryError> {
        self.categories
            .contains_key(&id)
            .then_some(())
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    pub fn require_product(&self, id: ProductId, fk: &str) -> Result<(), RepositoryError> {
        self.products
            .contains_key(&id)
            .then_some(())
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    pub fn require_supplier(&self, id: SupplierId, fk: &str) -> Result<(), RepositoryError> {
        self.suppliers
            .contains_key(&id)
            .then_some(())
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    pub fn require_order(&self, id: OrderId, fk: &str) -> Result<(), RepositoryError> {
        self.orders
            .contains_key(&id)
            .then_some(())
            .ok_or_else(|| RepositoryError::foreign_key(fk))
    }

    // =========================================================================
    // Order lines
    // =========================================================================

    /// Lines of one order, in line number order.
    pub fn items_of(&self, order_id: OrderId) -> impl Iterator<Item = &OrderItem> + '_ {
        self.order_items
            .range(OrderItemKey::new(order_id, i32::MIN)..=OrderItemKey::new(order_id, i32::MAX))
            .map(|(_, item)| item)
    }

    /// Allocate the next line number of an order.
    pub fn allocate_line_no(&mut self, order_id: OrderId) -> i32 {
        let next = self.next_line_no.entry(order_id).or_insert(1);
        let line_no = *next;
        *next += 1;
        line_no
    }

    /// Sum of an order's line subtotals; zero when it has none.
    pub fn sum_subtotals(&self, order_id: OrderId) -> Decimal {
        self.items_of(order_id).map(|item| item.subtotal).sum()
    }

    /// Recompute an order's total from its lines and store it.
    ///
    /// Recomputes from scratch rather than applying a delta, so a missed or
    /// repeated call can never leave the total drifted.
    pub fn refresh_order_total(&mut self, order_id: OrderId) -> Result<Money, RepositoryError> {
        let sum = self.sum_subtotals(order_id);
        let total = Money::new(sum)
            .map_err(|e| RepositoryError::check("orders_total_amount_check", e))?;
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| RepositoryError::not_found("orders", order_id))?;
        tracing::debug!(
            order_id = %order_id,
            previous = %order.total_amount,
            total = %total,
            "Refreshed order total"
        );
        order.total_amount = total;
        Ok(total)
    }

    // =========================================================================
    // Deletes with referential actions
    // =========================================================================

    pub fn delete_customer(&mut self, id: CustomerId) -> Result<Customer, RepositoryError> {
        let customer = self
            .customers
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("customers", id))?;

        if self.orders.values().any(|o| o.customer_id == id) {
            return Err(RepositoryError::restricted("orders_customer_id_fkey"));
        }

        let addresses: Vec<_> = self
            .addresses
            .values()
            .filter(|a| a.customer_id == id)
            .map(|a| a.id)
            .collect();
        for address_id in addresses {
            self.delete_address(address_id)?;
        }

        self.reviews.retain(|_, r| r.customer_id != id);

        let wishlists: Vec<_> = self
            .wishlists
            .values()
            .filter(|w| w.customer_id == id)
            .map(|w| w.id)
            .collect();
        for wishlist_id in wishlists {
            self.delete_wishlist(wishlist_id)?;
        }

        Ok(customer)
    }

    pub fn delete_address(&mut self, id: AddressId) -> Result<Address, RepositoryError> {
        let address = self
            .addresses
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("addresses", id))?;

        if self.orders.values().any(|o| o.shipping_address_id == id) {
            return Err(RepositoryError::restricted(
                "orders_shipping_address_id_fkey",
            ));
        }
        for order in self.orders.values_mut() {
            if order.billing_address_id == Some(id) {
                order.billing_address_id = None;
            }
        }
        Ok(address)
    }

    pub fn delete_category(&mut self, id: CategoryId) -> Result<Category, RepositoryError> {
        let category = self
            .categories
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("categories", id))?;

        // Orphaned subcategories become top-level.
        for child in self.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        self.product_categories.retain(|(_, c)| *c != id);
        Ok(category)
    }

    pub fn delete_product(&mut self, id: ProductId) -> Result<Product, RepositoryError> {
        let product = self
            .products
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("products", id))?;

        if self.order_items.values().any(|i| i.product_id == id) {
            return Err(RepositoryError::restricted("order_items_product_id_fkey"));
        }
        self.product_categories.retain(|(p, _)| *p != id);
        self.inventory.retain(|_, inv| inv.product_id != id);
        self.reviews.retain(|_, r| r.product_id != id);
        self.wishlist_items.retain(|(_, p), _| *p != id);
        Ok(product)
    }

    pub fn delete_supplier(&mut self, id: SupplierId) -> Result<Supplier, RepositoryError> {
        let supplier = self
            .suppliers
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("suppliers", id))?;

        for inv in self.inventory.values_mut() {
            if inv.supplier_id == Some(id) {
                inv.supplier_id = None;
            }
        }
        Ok(supplier)
    }

    pub fn delete_order(&mut self, id: OrderId) -> Result<Order, RepositoryError> {
        let order = self
            .orders
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("orders", id))?;

        self.order_items.retain(|key, _| key.order_id != id);
        self.payments.retain(|_, p| p.order_id != id);
        self.next_line_no.remove(&id);
        Ok(order)
    }

    pub fn delete_wishlist(&mut self, id: WishlistId) -> Result<Wishlist, RepositoryError> {
        let wishlist = self
            .wishlists
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("wishlists", id))?;

        self.wishlist_items.retain(|(w, _), _| *w != id);
        Ok(wishlist)
    }
}
