//! Categories, products, suppliers, and stock levels.

use chrono::Utc;
use rust_decimal::Decimal;

use shopkeep_core::{CategoryId, InventoryId, ProductId, SupplierId};

use super::{MemoryStore, check_money, check_non_negative};
use crate::RepositoryError;
use crate::models::{
    Category, Inventory, NewCategory, NewProduct, NewSupplier, Product, SetInventory, Supplier,
};

impl MemoryStore {
    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a category, optionally under a parent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate name and
    /// `RepositoryError::ForeignKey` for a missing parent.
    pub fn create_category(&mut self, input: NewCategory) -> Result<Category, RepositoryError> {
        self.write(|t, text| {
            let key = text.collation.unique_key(&input.name);
            if t
                .categories
                .values()
                .any(|c| text.collation.unique_key(&c.name) == key)
            {
                return Err(RepositoryError::conflict("categories_name_key"));
            }
            if let Some(parent_id) = input.parent_id {
                t.require_category(parent_id, "categories_parent_id_fkey")?;
            }

            let category = Category {
                id: t.seq.categories(),
                name: input.name,
                parent_id: input.parent_id,
                description: input.description,
            };
            t.categories.insert(category.id, category.clone());
            Ok(category)
        })
    }

    /// Get a category by ID.
    #[must_use]
    pub fn get_category(&self, id: CategoryId) -> Option<Category> {
        self.tables.categories.get(&id).cloned()
    }

    /// List the direct children of a category.
    #[must_use]
    pub fn list_subcategories(&self, parent_id: CategoryId) -> Vec<Category> {
        self.tables
            .categories
            .values()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect()
    }

    /// Delete a category. Its subcategories become top-level and its product
    /// assignments are removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub fn delete_category(&mut self, id: CategoryId) -> Result<Category, RepositoryError> {
        self.write(|t, _| t.delete_category(id))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate SKU and
    /// `RepositoryError::Check` for a negative price.
    pub fn create_product(&mut self, input: NewProduct) -> Result<Product, RepositoryError> {
        self.write(|t, text| {
            let price = check_money("products_price_check", input.price)?;
            let key = text.collation.unique_key(input.sku.as_str());
            if t
                .products
                .values()
                .any(|p| text.collation.unique_key(p.sku.as_str()) == key)
            {
                return Err(RepositoryError::conflict("products_sku_key"));
            }

            let product = Product {
                id: t.seq.products(),
                sku: input.sku,
                name: input.name,
                description: input.description,
                price,
                created_at: Utc::now(),
            };
            t.products.insert(product.id, product.clone());
            Ok(product)
        })
    }

    /// Get a product by ID.
    #[must_use]
    pub fn get_product(&self, id: ProductId) -> Option<Product> {
        self.tables.products.get(&id).cloned()
    }

    /// Change a product's list price. Existing order lines keep their own
    /// prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a negative price and
    /// `RepositoryError::NotFound` for an unknown product.
    pub fn update_price(&mut self, id: ProductId, price: Decimal) -> Result<Product, RepositoryError> {
        self.write(|t, _| {
            let price = check_money("products_price_check", price)?;
            let product = t
                .products
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::not_found("products", id))?;
            product.price = price;
            Ok(product.clone())
        })
    }

    /// Delete a product with its category assignments, stock level, reviews,
    /// and wishlist entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if any order line references it.
    pub fn delete_product(&mut self, id: ProductId) -> Result<Product, RepositoryError> {
        self.write(|t, _| t.delete_product(id))
    }

    /// Put a product in a category. Assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if either side does not exist.
    pub fn assign_category(
        &mut self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> Result<(), RepositoryError> {
        self.write(|t, _| {
            t.require_product(product_id, "product_categories_product_id_fkey")?;
            t.require_category(category_id, "product_categories_category_id_fkey")?;
            t.product_categories.insert((product_id, category_id));
            Ok(())
        })
    }

    /// Take a product out of a category. Returns whether it was assigned.
    pub fn unassign_category(&mut self, product_id: ProductId, category_id: CategoryId) -> bool {
        self.tables
            .product_categories
            .remove(&(product_id, category_id))
    }

    /// Categories a product belongs to.
    #[must_use]
    pub fn categories_of(&self, product_id: ProductId) -> Vec<CategoryId> {
        self.tables
            .product_categories
            .iter()
            .filter(|(p, _)| *p == product_id)
            .map(|(_, c)| *c)
            .collect()
    }

    // =========================================================================
    // Suppliers and inventory
    // =========================================================================

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Infallible today; kept fallible for parity with the database backend.
    pub fn create_supplier(&mut self, input: NewSupplier) -> Result<Supplier, RepositoryError> {
        self.write(|t, _| {
            let supplier = Supplier {
                id: t.seq.suppliers(),
                name: input.name,
                contact_email: input.contact_email,
                phone: input.phone,
                created_at: Utc::now(),
            };
            t.suppliers.insert(supplier.id, supplier.clone());
            Ok(supplier)
        })
    }

    /// Delete a supplier. Stock levels it supplied keep their rows with the
    /// supplier cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    pub fn delete_supplier(&mut self, id: SupplierId) -> Result<Supplier, RepositoryError> {
        self.write(|t, _| t.delete_supplier(id))
    }

    /// Create or replace a product's stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for negative counts and
    /// `RepositoryError::ForeignKey` for a missing product or supplier.
    pub fn set_inventory(&mut self, input: SetInventory) -> Result<Inventory, RepositoryError> {
        self.write(|t, _| {
            let quantity_on_hand =
                check_non_negative("inventory_quantity_on_hand_check", input.quantity_on_hand)?;
            let reorder_level =
                check_non_negative("inventory_reorder_level_check", input.reorder_level)?;
            t.require_product(input.product_id, "inventory_product_id_fkey")?;
            if let Some(supplier_id) = input.supplier_id {
                t.require_supplier(supplier_id, "inventory_supplier_id_fkey")?;
            }

            let existing: Option<InventoryId> = t
                .inventory
                .values()
                .find(|inv| inv.product_id == input.product_id)
                .map(|inv| inv.id);
            let id = existing.unwrap_or_else(|| t.seq.inventory());
            let row = Inventory {
                id,
                product_id: input.product_id,
                supplier_id: input.supplier_id,
                quantity_on_hand,
                reorder_level,
                updated_at: Utc::now(),
            };
            t.inventory.insert(id, row.clone());
            Ok(row)
        })
    }

    /// Stock level of a product, if one has been recorded.
    #[must_use]
    pub fn get_inventory(&self, product_id: ProductId) -> Option<Inventory> {
        self.tables
            .inventory
            .values()
            .find(|inv| inv.product_id == product_id)
            .cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopkeep_core::Sku;

    use super::*;
    use crate::memory::test_support::{line, order, product};

    fn category(store: &mut MemoryStore, name: &str, parent: Option<CategoryId>) -> CategoryId {
        store
            .create_category(NewCategory {
                name: name.to_owned(),
                parent_id: parent,
                description: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut store = MemoryStore::default();
        let err = store
            .create_product(NewProduct {
                sku: Sku::parse("NEG-1").unwrap(),
                name: "Negative".to_owned(),
                description: None,
                price: Decimal::new(-100, 2),
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Check { ref constraint, .. } if constraint == "products_price_check"));
        assert!(store.get_product(ProductId::new(1)).is_none());
    }

    #[test]
    fn test_duplicate_sku_rejected() {
        let mut store = MemoryStore::default();
        product(&mut store, "TEE-1", 1000);
        let err = store
            .create_product(NewProduct {
                sku: Sku::parse("tee-1").unwrap(),
                name: "Dup".to_owned(),
                description: None,
                price: Decimal::ONE,
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { ref constraint } if constraint == "products_sku_key"));
    }

    #[test]
    fn test_delete_parent_category_orphans_children() {
        let mut store = MemoryStore::default();
        let apparel = category(&mut store, "Apparel", None);
        let shirts = category(&mut store, "Shirts", Some(apparel));
        let hats = category(&mut store, "Hats", Some(apparel));
        let tee = product(&mut store, "TEE-1", 1500);
        store.assign_category(tee, apparel).unwrap();
        store.assign_category(tee, shirts).unwrap();

        store.delete_category(apparel).unwrap();

        assert_eq!(store.get_category(shirts).unwrap().parent_id, None);
        assert_eq!(store.get_category(hats).unwrap().parent_id, None);
        assert_eq!(store.categories_of(tee), vec![shirts]);
    }

    #[test]
    fn test_category_parent_must_exist() {
        let mut store = MemoryStore::default();
        let err = store
            .create_category(NewCategory {
                name: "Orphan".to_owned(),
                parent_id: Some(CategoryId::new(41)),
                description: None,
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey { .. }));
    }

    #[test]
    fn test_delete_product_on_order_restricted() {
        let mut store = MemoryStore::default();
        let (_, _, order_id) = order(&mut store, "buyer@example.com");
        let tee = product(&mut store, "TEE-1", 1500);
        store.add_item(order_id, line(tee, 1500)).unwrap();

        let err = store.delete_product(tee).unwrap_err();
        assert!(matches!(err, RepositoryError::Restricted { ref constraint } if constraint == "order_items_product_id_fkey"));
        assert!(store.get_product(tee).is_some());
    }

    #[test]
    fn test_delete_product_cascades_catalog_rows() {
        let mut store = MemoryStore::default();
        let tee = product(&mut store, "TEE-1", 1500);
        let apparel = category(&mut store, "Apparel", None);
        store.assign_category(tee, apparel).unwrap();
        store
            .set_inventory(SetInventory {
                product_id: tee,
                supplier_id: None,
                quantity_on_hand: 10,
                reorder_level: 2,
            })
            .unwrap();

        store.delete_product(tee).unwrap();

        assert!(store.categories_of(tee).is_empty());
        assert!(store.get_inventory(tee).is_none());
        assert!(store.get_category(apparel).is_some());
    }

    #[test]
    fn test_delete_supplier_clears_inventory_supplier() {
        let mut store = MemoryStore::default();
        let tee = product(&mut store, "TEE-1", 1500);
        let supplier = store
            .create_supplier(NewSupplier {
                name: "Mill".to_owned(),
                contact_email: None,
                phone: None,
            })
            .unwrap();
        store
            .set_inventory(SetInventory {
                product_id: tee,
                supplier_id: Some(supplier.id),
                quantity_on_hand: 4,
                reorder_level: 1,
            })
            .unwrap();

        store.delete_supplier(supplier.id).unwrap();

        let inv = store.get_inventory(tee).unwrap();
        assert_eq!(inv.supplier_id, None);
        assert_eq!(inv.quantity_on_hand, 4);
    }

    #[test]
    fn test_set_inventory_replaces_and_validates() {
        let mut store = MemoryStore::default();
        let tee = product(&mut store, "TEE-1", 1500);
        let first = store
            .set_inventory(SetInventory {
                product_id: tee,
                supplier_id: None,
                quantity_on_hand: 3,
                reorder_level: 0,
            })
            .unwrap();
        let second = store
            .set_inventory(SetInventory {
                product_id: tee,
                supplier_id: None,
                quantity_on_hand: 9,
                reorder_level: 0,
            })
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.get_inventory(tee).unwrap().quantity_on_hand, 9);

        let err = store
            .set_inventory(SetInventory {
                product_id: tee,
                supplier_id: None,
                quantity_on_hand: -1,
                reorder_level: 0,
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Check { .. }));
    }
}
