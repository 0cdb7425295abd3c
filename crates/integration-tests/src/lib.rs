//! Integration tests for Shopkeep.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory engine tests run everywhere
//! cargo test -p shopkeep-integration-tests
//!
//! # PostgreSQL tests need a disposable database
//! export SHOPKEEP_TEST_DATABASE_URL=postgres://localhost/shopkeep_test
//! cargo test -p shopkeep-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `memory_totals` - Order total consistency in the in-memory engine
//! - `memory_referential` - Delete actions and check constraints
//! - `postgres_totals` - The same properties against the trigger
//!
//! Every fixture creates rows under a fresh email or SKU, so tests can share
//! one database and run in parallel.

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use uuid::Uuid;

use shopkeep_core::{AddressId, CustomerId, Email, OrderId, ProductId, Sku};
use shopkeep_store::models::{NewAddress, NewCustomer, NewOrderItem, NewProduct};
use shopkeep_store::{StoreConfig, TextSettings};

/// An order with the customer and address it was created for.
#[derive(Debug, Clone, Copy)]
pub struct OrderFixture {
    pub customer_id: CustomerId,
    pub address_id: AddressId,
    pub order_id: OrderId,
}

/// A decimal amount from a count of cents.
#[must_use]
pub fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

/// An email address no other test uses.
#[must_use]
pub fn unique_email(prefix: &str) -> Email {
    Email::parse(&format!("{prefix}-{}@example.com", Uuid::new_v4()))
        .expect("Generated email should be valid")
}

/// A SKU no other test uses.
#[must_use]
pub fn unique_sku(prefix: &str) -> Sku {
    Sku::parse(&format!("{prefix}-{}", Uuid::new_v4().simple()))
        .expect("Generated SKU should be valid")
}

#[must_use]
pub fn new_customer(prefix: &str) -> NewCustomer {
    NewCustomer {
        email: unique_email(prefix),
        first_name: "Test".to_owned(),
        last_name: "Customer".to_owned(),
        phone: None,
    }
}

#[must_use]
pub fn new_address(customer_id: CustomerId) -> NewAddress {
    NewAddress {
        customer_id,
        line1: "100 Main St".to_owned(),
        line2: None,
        city: "Springfield".to_owned(),
        region: Some("OR".to_owned()),
        postal_code: "97477".to_owned(),
        country: "US".to_owned(),
    }
}

#[must_use]
pub fn new_product(prefix: &str, price: Decimal) -> NewProduct {
    NewProduct {
        sku: unique_sku(prefix),
        name: format!("Test {prefix}"),
        description: None,
        price,
    }
}

/// One unit of a product whose subtotal equals its unit price.
#[must_use]
pub fn line(product_id: ProductId, subtotal_cents: i64) -> NewOrderItem {
    NewOrderItem {
        product_id,
        unit_price: cents(subtotal_cents),
        quantity: 1,
        subtotal: cents(subtotal_cents),
    }
}

pub mod memory {
    //! Fixtures for the in-memory engine.

    use shopkeep_core::ProductId;
    use shopkeep_store::MemoryStore;
    use shopkeep_store::models::NewOrder;

    use super::{OrderFixture, cents, new_address, new_customer, new_product};

    /// Create a customer, an address, and an empty order.
    pub fn seed_order(store: &mut MemoryStore) -> OrderFixture {
        let customer = store
            .create_customer(new_customer("mem"))
            .expect("Failed to create customer");
        let address = store
            .add_address(new_address(customer.id))
            .expect("Failed to create address");
        let order = store
            .create_order(NewOrder {
                customer_id: customer.id,
                shipping_address_id: address.id,
                billing_address_id: None,
            })
            .expect("Failed to create order");
        OrderFixture {
            customer_id: customer.id,
            address_id: address.id,
            order_id: order.id,
        }
    }

    /// Create a product priced in cents.
    pub fn seed_product(store: &mut MemoryStore, price_cents: i64) -> ProductId {
        store
            .create_product(new_product("mem", cents(price_cents)))
            .expect("Failed to create product")
            .id
    }
}

pub mod postgres {
    //! Fixtures for a live `PostgreSQL` database.

    use shopkeep_core::ProductId;
    use shopkeep_store::db::{CatalogRepository, CustomerRepository, OrderRepository};
    use shopkeep_store::models::NewOrder;
    use sqlx::PgPool;

    use super::{OrderFixture, cents, new_address, new_customer, new_product};

    /// Connect to `SHOPKEEP_TEST_DATABASE_URL` and apply migrations.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unset or the database is unreachable.
    pub async fn pool() -> PgPool {
        let config = super::test_config();
        let pool = shopkeep_store::db::create_pool(&config)
            .await
            .expect("Failed to connect to test database");
        shopkeep_store::migrate(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    /// Create a customer, an address, and an empty order.
    pub async fn seed_order(pool: &PgPool) -> OrderFixture {
        let customers = CustomerRepository::new(pool);
        let customer = customers
            .create(&new_customer("pg"))
            .await
            .expect("Failed to create customer");
        let address = customers
            .add_address(&new_address(customer.id))
            .await
            .expect("Failed to create address");
        let order = OrderRepository::new(pool)
            .create(&NewOrder {
                customer_id: customer.id,
                shipping_address_id: address.id,
                billing_address_id: None,
            })
            .await
            .expect("Failed to create order");
        OrderFixture {
            customer_id: customer.id,
            address_id: address.id,
            order_id: order.id,
        }
    }

    /// Create a product priced in cents.
    pub async fn seed_product(pool: &PgPool, price_cents: i64) -> ProductId {
        CatalogRepository::new(pool)
            .create_product(&new_product("pg", cents(price_cents)))
            .await
            .expect("Failed to create product")
            .id
    }
}

fn test_config() -> StoreConfig {
    let url = std::env::var("SHOPKEEP_TEST_DATABASE_URL")
        .expect("SHOPKEEP_TEST_DATABASE_URL must be set for PostgreSQL tests");
    StoreConfig {
        database_url: SecretString::from(url),
        max_connections: 20,
        min_connections: 1,
        acquire_timeout: Duration::from_secs(10),
        text: TextSettings::default(),
    }
}
