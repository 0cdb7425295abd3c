//! Typed primary keys.
//!
//! Every table keyed by a `SERIAL` gets its own id type, so an `OrderId`
//! can never be bound where a `ProductId` is expected. Order lines are the
//! exception: they are keyed by [`OrderItemKey`].

use serde::{Deserialize, Serialize};

/// Define an `i32` key newtype matching a `SERIAL` primary key column.
///
/// The generated type is `Copy`, totally ordered, serializes as a bare
/// integer, and (with the `postgres` feature) binds and decodes as `INT4`.
/// Ordering matters: callers sort ids before taking row locks.
///
/// ```rust
/// # use shopkeep_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(ShipmentId);
///
/// let invoice = InvoiceId::new(1);
/// assert_eq!(invoice.as_i32(), 1);
/// assert_eq!("1".parse::<InvoiceId>().ok(), Some(invoice));
///
/// // Different types, so this won't compile:
/// // let _: InvoiceId = ShipmentId::new(1);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw key.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(CustomerId);
define_id!(AddressId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(SupplierId);
define_id!(InventoryId);
define_id!(OrderId);
define_id!(PaymentId);
define_id!(ReviewId);
define_id!(WishlistId);
define_id!(ChangeLogId);

/// Composite identity of an order line: the owning order plus a per-order
/// sequence number.
///
/// Line numbers start at 1 and are never reused within an order, so a key
/// stays unambiguous after earlier lines are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderItemKey {
    /// Order that owns the line.
    pub order_id: OrderId,
    /// Sequence number within the order.
    pub line_no: i32,
}

impl OrderItemKey {
    /// Create a new order item key.
    #[must_use]
    pub const fn new(order_id: OrderId, line_no: i32) -> Self {
        Self { order_id, line_no }
    }
}

impl core::fmt::Display for OrderItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.order_id, self.line_no)
    }
}
