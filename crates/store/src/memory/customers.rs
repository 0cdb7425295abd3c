//! Customers and addresses.

use chrono::Utc;

use shopkeep_core::{AddressId, CustomerId, Email};

use super::MemoryStore;
use crate::RepositoryError;
use crate::models::{Address, Customer, NewAddress, NewCustomer};

impl MemoryStore {
    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken under
    /// the store's collation.
    pub fn create_customer(&mut self, input: NewCustomer) -> Result<Customer, RepositoryError> {
        self.write(|t, text| {
            let key = text.collation.unique_key(input.email.as_str());
            if t
                .customers
                .values()
                .any(|c| text.collation.unique_key(c.email.as_str()) == key)
            {
                return Err(RepositoryError::conflict("customers_email_key"));
            }

            let customer = Customer {
                id: t.seq.customers(),
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                phone: input.phone,
                created_at: Utc::now(),
            };
            t.customers.insert(customer.id, customer.clone());
            Ok(customer)
        })
    }

    /// Get a customer by ID.
    #[must_use]
    pub fn get_customer(&self, id: CustomerId) -> Option<Customer> {
        self.tables.customers.get(&id).cloned()
    }

    /// Get a customer by email, compared under the store's collation.
    #[must_use]
    pub fn get_customer_by_email(&self, email: &Email) -> Option<Customer> {
        let collation = self.text.collation;
        let key = collation.unique_key(email.as_str());
        self.tables
            .customers
            .values()
            .find(|c| collation.unique_key(c.email.as_str()) == key)
            .cloned()
    }

    /// Delete a customer along with their addresses, reviews, and wishlists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if the customer has orders, or if
    /// one of their addresses is still an order's shipping address.
    pub fn delete_customer(&mut self, id: CustomerId) -> Result<Customer, RepositoryError> {
        let deleted = self.write(|t, _| t.delete_customer(id))?;
        tracing::info!(customer_id = %id, "Deleted customer");
        Ok(deleted)
    }

    /// Add an address for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer does not exist.
    pub fn add_address(&mut self, input: NewAddress) -> Result<Address, RepositoryError> {
        self.write(|t, _| {
            t.require_customer(input.customer_id, "addresses_customer_id_fkey")?;
            let address = Address {
                id: t.seq.addresses(),
                customer_id: input.customer_id,
                line1: input.line1,
                line2: input.line2,
                city: input.city,
                region: input.region,
                postal_code: input.postal_code,
                country: input.country,
                created_at: Utc::now(),
            };
            t.addresses.insert(address.id, address.clone());
            Ok(address)
        })
    }

    /// Get an address by ID.
    #[must_use]
    pub fn get_address(&self, id: AddressId) -> Option<Address> {
        self.tables.addresses.get(&id).cloned()
    }

    /// List a customer's addresses.
    #[must_use]
    pub fn list_addresses(&self, customer_id: CustomerId) -> Vec<Address> {
        self.tables
            .addresses
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect()
    }

    /// Delete an address. Orders billed to it lose their billing address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if an order ships to it.
    pub fn delete_address(&mut self, id: AddressId) -> Result<Address, RepositoryError> {
        self.write(|t, _| t.delete_address(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Collation, TextSettings};
    use crate::memory::test_support::{address, customer, order};
    use crate::models::NewOrder;

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            email: Email::parse(email).unwrap(),
            first_name: "Grace".to_owned(),
            last_name: "Hopper".to_owned(),
            phone: Some("555-0100".to_owned()),
        }
    }

    #[test]
    fn test_email_unique_case_insensitive_by_default() {
        let mut store = MemoryStore::default();
        store.create_customer(new_customer("grace@navy.mil")).unwrap();
        let err = store
            .create_customer(new_customer("Grace@Navy.MIL"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { ref constraint } if constraint == "customers_email_key"));
    }

    #[test]
    fn test_email_unique_binary_collation() {
        let mut store = MemoryStore::new(TextSettings {
            collation: Collation::Binary,
            ..TextSettings::default()
        });
        store.create_customer(new_customer("grace@navy.mil")).unwrap();
        assert!(store.create_customer(new_customer("Grace@navy.mil")).is_ok());
        assert!(store.create_customer(new_customer("grace@navy.mil")).is_err());
    }

    #[test]
    fn test_lookup_by_email() {
        let mut store = MemoryStore::default();
        let created = store.create_customer(new_customer("grace@navy.mil")).unwrap();
        let found = store
            .get_customer_by_email(&Email::parse("GRACE@navy.mil").unwrap())
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[test]
    fn test_address_requires_customer() {
        let mut store = MemoryStore::default();
        let err = store
            .add_address(NewAddress {
                customer_id: CustomerId::new(99),
                line1: "x".to_owned(),
                line2: None,
                city: "y".to_owned(),
                region: None,
                postal_code: "z".to_owned(),
                country: "US".to_owned(),
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey { .. }));
    }

    #[test]
    fn test_delete_customer_cascades_addresses() {
        let mut store = MemoryStore::default();
        let id = customer(&mut store, "gone@example.com");
        let a1 = address(&mut store, id);
        let a2 = address(&mut store, id);

        store.delete_customer(id).unwrap();

        assert!(store.get_customer(id).is_none());
        assert!(store.get_address(a1).is_none());
        assert!(store.get_address(a2).is_none());
    }

    #[test]
    fn test_delete_customer_with_orders_restricted() {
        let mut store = MemoryStore::default();
        let (customer_id, address_id, order_id) = order(&mut store, "buyer@example.com");

        let err = store.delete_customer(customer_id).unwrap_err();
        assert!(matches!(err, RepositoryError::Restricted { ref constraint } if constraint == "orders_customer_id_fkey"));

        // Nothing was applied.
        assert!(store.get_customer(customer_id).is_some());
        assert!(store.get_address(address_id).is_some());
        assert!(store.get_order(order_id).is_some());
    }

    #[test]
    fn test_delete_billing_address_sets_null() {
        let mut store = MemoryStore::default();
        let customer_id = customer(&mut store, "bill@example.com");
        let ship = address(&mut store, customer_id);
        let bill = address(&mut store, customer_id);
        let order = store
            .create_order(NewOrder {
                customer_id,
                shipping_address_id: ship,
                billing_address_id: Some(bill),
            })
            .unwrap();

        store.delete_address(bill).unwrap();
        assert_eq!(store.get_order(order.id).unwrap().billing_address_id, None);

        let err = store.delete_address(ship).unwrap_err();
        assert!(matches!(err, RepositoryError::Restricted { .. }));
    }
}
