//! Customer repository for database operations.
//!
//! Emails are unique case-insensitively through the `customers_email_key`
//! index on `lower(email)`.

use sqlx::PgPool;

use shopkeep_core::{AddressId, CustomerId, Email};

use crate::RepositoryError;
use crate::models::{Address, Customer, NewAddress, NewCustomer};

/// Repository for customers and their addresses.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &NewCustomer) -> Result<Customer, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r"
            INSERT INTO shop.customers (email, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, phone, created_at
            ",
        )
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        tracing::info!(customer_id = %customer.id, "Created customer");
        Ok(customer)
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r"
            SELECT id, email, first_name, last_name, phone, created_at
            FROM shop.customers
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(customer)
    }

    /// Get a customer by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r"
            SELECT id, email, first_name, last_name, phone, created_at
            FROM shop.customers
            WHERE lower(email) = lower($1)
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(customer)
    }

    /// Delete a customer. Addresses, reviews, and wishlists go with them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if the customer has orders.
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.customers WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("customers", id));
        }
        tracing::info!(customer_id = %id, "Deleted customer");
        Ok(())
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Add an address for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer does not exist.
    pub async fn add_address(&self, input: &NewAddress) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(
            r"
            INSERT INTO shop.addresses
                (customer_id, line1, line2, city, region, postal_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, customer_id, line1, line2, city, region, postal_code,
                      country, created_at
            ",
        )
        .bind(input.customer_id)
        .bind(&input.line1)
        .bind(&input.line2)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.postal_code)
        .bind(&input.country)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// List a customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(
            r"
            SELECT id, customer_id, line1, line2, city, region, postal_code,
                   country, created_at
            FROM shop.addresses
            WHERE customer_id = $1
            ORDER BY id
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Delete an address. Orders billed to it lose their billing address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if an order ships to it.
    /// Returns `RepositoryError::NotFound` if the address does not exist.
    pub async fn delete_address(&self, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.addresses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("addresses", id));
        }
        Ok(())
    }
}
