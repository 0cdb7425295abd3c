//! Static catalog of the `shop` schema.
//!
//! Describes every table's keys and constraints, and every foreign key's
//! delete action. The in-memory engine applies these same actions, and the
//! tests below check that the migrations declare exactly what is listed here.

use core::fmt;

use serde::Serialize;

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Delete the referencing rows too.
    Cascade,
    /// Refuse the delete while referencing rows exist.
    Restrict,
    /// Clear the referencing column.
    SetNull,
}

impl ReferentialAction {
    /// SQL spelling used in `ON DELETE` clauses.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key from one column to another table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    /// Constraint name as created by the migrations.
    pub name: &'static str,
    /// Referencing column.
    pub column: &'static str,
    /// Referenced table.
    pub references: &'static str,
    /// Delete action.
    pub on_delete: ReferentialAction,
}

/// A table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Table name within the `shop` schema.
    pub name: &'static str,
    /// Primary key columns.
    pub primary_key: &'static [&'static str],
    /// Unique constraint (or unique index) names.
    pub unique: &'static [&'static str],
    /// Check constraint names.
    pub checks: &'static [&'static str],
    /// Outgoing foreign keys.
    pub foreign_keys: &'static [ForeignKey],
}

const fn fk(
    name: &'static str,
    column: &'static str,
    references: &'static str,
    on_delete: ReferentialAction,
) -> ForeignKey {
    ForeignKey {
        name,
        column,
        references,
        on_delete,
    }
}

use ReferentialAction::{Cascade, Restrict, SetNull};

static TABLES: &[Table] = &[
    Table {
        name: "customers",
        primary_key: &["id"],
        unique: &["customers_email_key"],
        checks: &[],
        foreign_keys: &[],
    },
    Table {
        name: "addresses",
        primary_key: &["id"],
        unique: &[],
        checks: &[],
        foreign_keys: &[fk(
            "addresses_customer_id_fkey",
            "customer_id",
            "customers",
            Cascade,
        )],
    },
    Table {
        name: "categories",
        primary_key: &["id"],
        unique: &["categories_name_key"],
        checks: &["categories_not_own_parent"],
        foreign_keys: &[fk(
            "categories_parent_id_fkey",
            "parent_id",
            "categories",
            SetNull,
        )],
    },
    Table {
        name: "suppliers",
        primary_key: &["id"],
        unique: &[],
        checks: &[],
        foreign_keys: &[],
    },
    Table {
        name: "products",
        primary_key: &["id"],
        unique: &["products_sku_key"],
        checks: &["products_price_check"],
        foreign_keys: &[],
    },
    Table {
        name: "product_categories",
        primary_key: &["product_id", "category_id"],
        unique: &[],
        checks: &[],
        foreign_keys: &[
            fk(
                "product_categories_product_id_fkey",
                "product_id",
                "products",
                Cascade,
            ),
            fk(
                "product_categories_category_id_fkey",
                "category_id",
                "categories",
                Cascade,
            ),
        ],
    },
    Table {
        name: "inventory",
        primary_key: &["id"],
        unique: &["inventory_product_id_key"],
        checks: &[
            "inventory_quantity_on_hand_check",
            "inventory_reorder_level_check",
        ],
        foreign_keys: &[
            fk(
                "inventory_product_id_fkey",
                "product_id",
                "products",
                Cascade,
            ),
            fk(
                "inventory_supplier_id_fkey",
                "supplier_id",
                "suppliers",
                SetNull,
            ),
        ],
    },
    Table {
        name: "orders",
        primary_key: &["id"],
        unique: &[],
        checks: &["orders_status_check", "orders_total_amount_check"],
        foreign_keys: &[
            fk(
                "orders_customer_id_fkey",
                "customer_id",
                "customers",
                Restrict,
            ),
            fk(
                "orders_shipping_address_id_fkey",
                "shipping_address_id",
                "addresses",
                Restrict,
            ),
            fk(
                "orders_billing_address_id_fkey",
                "billing_address_id",
                "addresses",
                SetNull,
            ),
        ],
    },
    Table {
        name: "order_items",
        primary_key: &["order_id", "line_no"],
        unique: &[],
        checks: &[
            "order_items_unit_price_check",
            "order_items_quantity_check",
            "order_items_subtotal_check",
        ],
        foreign_keys: &[
            fk("order_items_order_id_fkey", "order_id", "orders", Cascade),
            fk(
                "order_items_product_id_fkey",
                "product_id",
                "products",
                Restrict,
            ),
        ],
    },
    Table {
        name: "payments",
        primary_key: &["id"],
        unique: &["payments_provider_txn_id_key"],
        checks: &["payments_amount_check", "payments_status_check"],
        foreign_keys: &[fk("payments_order_id_fkey", "order_id", "orders", Cascade)],
    },
    Table {
        name: "reviews",
        primary_key: &["id"],
        unique: &[],
        checks: &["reviews_rating_check"],
        foreign_keys: &[
            fk("reviews_product_id_fkey", "product_id", "products", Cascade),
            fk(
                "reviews_customer_id_fkey",
                "customer_id",
                "customers",
                Cascade,
            ),
        ],
    },
    Table {
        name: "wishlists",
        primary_key: &["id"],
        unique: &[],
        checks: &[],
        foreign_keys: &[fk(
            "wishlists_customer_id_fkey",
            "customer_id",
            "customers",
            Cascade,
        )],
    },
    Table {
        name: "wishlist_items",
        primary_key: &["wishlist_id", "product_id"],
        unique: &[],
        checks: &[],
        foreign_keys: &[
            fk(
                "wishlist_items_wishlist_id_fkey",
                "wishlist_id",
                "wishlists",
                Cascade,
            ),
            fk(
                "wishlist_items_product_id_fkey",
                "product_id",
                "products",
                Cascade,
            ),
        ],
    },
    Table {
        name: "change_log",
        primary_key: &["id"],
        unique: &[],
        checks: &["change_log_action_check"],
        foreign_keys: &[],
    },
];

/// All tables, in migration order.
#[must_use]
pub fn tables() -> &'static [Table] {
    TABLES
}

/// Look up a table by name.
#[must_use]
pub fn table(name: &str) -> Option<&'static Table> {
    TABLES.iter().find(|t| t.name == name)
}

/// Every foreign key that points at `table`, paired with the table holding it.
pub fn foreign_keys_referencing(
    table: &str,
) -> impl Iterator<Item = (&'static Table, &'static ForeignKey)> + '_ {
    TABLES.iter().flat_map(move |t| {
        t.foreign_keys
            .iter()
            .filter(move |fk| fk.references == table)
            .map(move |fk| (t, fk))
    })
}

/// Look up a foreign key by constraint name.
#[must_use]
pub fn foreign_key(name: &str) -> Option<&'static ForeignKey> {
    TABLES
        .iter()
        .flat_map(|t| t.foreign_keys.iter())
        .find(|fk| fk.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATIONS: &[&str] = &[
        include_str!("../migrations/20261015000001_create_customers.sql"),
        include_str!("../migrations/20261015000002_create_catalog.sql"),
        include_str!("../migrations/20261015000003_create_orders.sql"),
        include_str!("../migrations/20261015000004_create_engagement.sql"),
        include_str!("../migrations/20261015000005_create_change_log.sql"),
    ];

    fn migration_sql() -> String {
        MIGRATIONS.concat()
    }

    /// Collapse runs of whitespace so multi-line declarations compare as one line.
    fn squash(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_thirteen_entities_plus_junction() {
        assert_eq!(tables().len(), 14);
        assert!(table("product_categories").is_some());
        assert!(table("nope").is_none());
    }

    #[test]
    fn test_every_table_is_created() {
        let sql = migration_sql();
        for t in tables() {
            let needle = format!("CREATE TABLE shop.{} (", t.name);
            assert!(sql.contains(&needle), "missing {needle}");
        }
    }

    #[test]
    fn test_foreign_keys_match_migrations() {
        let sql = squash(&migration_sql());
        for t in tables() {
            for fk in t.foreign_keys {
                let needle = format!(
                    "CONSTRAINT {} REFERENCES shop.{} (id) ON DELETE {}",
                    fk.name, fk.references, fk.on_delete
                );
                assert!(sql.contains(&needle), "missing {needle}");
            }
        }
        assert_eq!(sql.matches("REFERENCES").count(), TABLES.iter().map(|t| t.foreign_keys.len()).sum::<usize>());
    }

    #[test]
    fn test_checks_and_uniques_are_declared() {
        let sql = migration_sql();
        for t in tables() {
            for name in t.checks.iter().chain(t.unique) {
                assert!(sql.contains(name), "missing constraint {name}");
            }
        }
    }

    #[test]
    fn test_referential_actions() {
        let on = |name| foreign_key(name).map(|fk| fk.on_delete);
        assert_eq!(on("addresses_customer_id_fkey"), Some(Cascade));
        assert_eq!(on("orders_customer_id_fkey"), Some(Restrict));
        assert_eq!(on("orders_shipping_address_id_fkey"), Some(Restrict));
        assert_eq!(on("order_items_product_id_fkey"), Some(Restrict));
        assert_eq!(on("categories_parent_id_fkey"), Some(SetNull));
        assert_eq!(on("orders_billing_address_id_fkey"), Some(SetNull));
        assert_eq!(on("inventory_supplier_id_fkey"), Some(SetNull));
    }

    #[test]
    fn test_foreign_keys_referencing_orders() {
        let mut names: Vec<_> = foreign_keys_referencing("orders")
            .map(|(t, _)| t.name)
            .collect();
        names.sort_unstable();
        assert_eq!(names, ["order_items", "payments"]);
    }
}
