//! Domain types for rows of the `shop` schema, plus the inputs used to create
//! and change them.
//!
//! Inputs carry raw numbers (`Decimal`, `i32`, `i16`) for the columns guarded
//! by `CHECK` constraints, so that out-of-range values reach the store and are
//! rejected there with the constraint's name, the same way the database
//! rejects them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shopkeep_core::{
    AddressId, CategoryId, ChangeAction, ChangeLogId, CustomerId, Email, InventoryId, Money,
    OrderId, OrderItemKey, OrderStatus, PaymentId, PaymentStatus, ProductId, Quantity, Rating,
    ReviewId, Sku, SupplierId, WishlistId,
};

// =============================================================================
// Customers
// =============================================================================

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// A postal address owned by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for adding an address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub customer_id: CustomerId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// `None` for top-level categories.
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// Parameters for creating a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: Sku,
    pub name: String,
    pub description: Option<String>,
    /// Must be non-negative.
    pub price: Decimal,
}

/// A supplier of stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_email: Option<Email>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a supplier.
#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub name: String,
    pub contact_email: Option<Email>,
    pub phone: Option<String>,
}

/// Stock level of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Inventory {
    pub id: InventoryId,
    pub product_id: ProductId,
    /// Cleared when the supplier is deleted.
    pub supplier_id: Option<SupplierId>,
    pub quantity_on_hand: i32,
    pub reorder_level: i32,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating or replacing a product's stock level.
#[derive(Debug, Clone)]
pub struct SetInventory {
    pub product_id: ProductId,
    pub supplier_id: Option<SupplierId>,
    /// Must be non-negative.
    pub quantity_on_hand: i32,
    /// Must be non-negative.
    pub reorder_level: i32,
}

// =============================================================================
// Orders
// =============================================================================

/// An order.
///
/// `total_amount` is a cached aggregate: it always equals the sum of the
/// order's line subtotals, and zero when the order has no lines. Only the
/// item write path updates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub shipping_address_id: AddressId,
    /// Cleared when the billing address is deleted.
    pub billing_address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an order. New orders start `pending` with a zero total.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub shipping_address_id: AddressId,
    pub billing_address_id: Option<AddressId>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub line_no: i32,
    pub product_id: ProductId,
    pub unit_price: Money,
    pub quantity: Quantity,
    /// Supplied by the writer; not derived from `unit_price * quantity`.
    pub subtotal: Money,
}

impl OrderItem {
    /// Composite identity of this line.
    #[must_use]
    pub const fn key(&self) -> OrderItemKey {
        OrderItemKey::new(self.order_id, self.line_no)
    }
}

/// Parameters for adding a line to an order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    /// Must be non-negative.
    pub unit_price: Decimal,
    /// Must be greater than zero.
    pub quantity: i32,
    /// Must be non-negative.
    pub subtotal: Decimal,
}

/// Changes to an existing line. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct OrderItemChanges {
    pub product_id: Option<ProductId>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub subtotal: Option<Decimal>,
}

/// An order whose stored total disagrees with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TotalDrift {
    pub order_id: OrderId,
    /// Value currently stored on the order.
    pub stored: Money,
    /// Sum of the order's line subtotals.
    pub expected: Money,
}

// =============================================================================
// Payments
// =============================================================================

/// A payment attempt against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: String,
    pub status: PaymentStatus,
    /// Payment provider's transaction reference. Unique when present.
    pub provider_txn_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for recording a payment. New payments start `initiated`.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    /// Must be non-negative.
    pub amount: Decimal,
    pub method: String,
    pub provider_txn_id: Option<String>,
}

// =============================================================================
// Engagement
// =============================================================================

/// A customer's review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub rating: Rating,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    /// Must be between 1 and 5.
    pub rating: i16,
    pub body: Option<String>,
}

/// A named list of products a customer wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Wishlist {
    pub id: WishlistId,
    pub customer_id: CustomerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A product on a wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct WishlistItem {
    pub wishlist_id: WishlistId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

// =============================================================================
// Audit
// =============================================================================

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ChangeLogEntry {
    pub id: ChangeLogId,
    /// Who made the change.
    pub actor: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: ChangeAction,
    /// Arbitrary structured detail.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Parameters for appending an audit record.
#[derive(Debug, Clone)]
pub struct NewChangeLogEntry {
    pub actor: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: ChangeAction,
    pub payload: serde_json::Value,
}
