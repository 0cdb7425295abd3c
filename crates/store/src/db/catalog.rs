//! Catalog repository: categories, products, suppliers, and stock levels.

use rust_decimal::Decimal;
use sqlx::PgPool;

use shopkeep_core::{CategoryId, ProductId, SupplierId};

use crate::RepositoryError;
use crate::models::{
    Category, Inventory, NewCategory, NewProduct, NewSupplier, Product, SetInventory, Supplier,
};

/// Repository for the product catalog.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate name and
    /// `RepositoryError::ForeignKey` for a missing parent.
    pub async fn create_category(&self, input: &NewCategory) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO shop.categories (name, parent_id, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, parent_id, description
            ",
        )
        .bind(&input.name)
        .bind(input.parent_id)
        .bind(&input.description)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, description FROM shop.categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Delete a category. Subcategories become top-level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("categories", id));
        }
        Ok(())
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
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO shop.products (sku, name, description, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sku, name, description, price, created_at
            ",
        )
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Created product");
        Ok(product)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, sku, name, description, price, created_at
            FROM shop.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Change a product's list price. Existing order lines keep their prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a negative price.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update_price(
        &self,
        id: ProductId,
        price: Decimal,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE shop.products
            SET price = $2
            WHERE id = $1
            RETURNING id, sku, name, description, price, created_at
            ",
        )
        .bind(id)
        .bind(price)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or_else(|| RepositoryError::not_found("products", id))
    }

    /// Delete a product with its category assignments, stock level, reviews,
    /// and wishlist entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Restricted` if an order line references it.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("products", id));
        }
        Ok(())
    }

    /// Put a product in a category. Assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if either side does not exist.
    pub async fn assign_category(
        &self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.product_categories (product_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(())
    }

    /// Take a product out of a category. Returns whether it was assigned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unassign_category(
        &self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.product_categories WHERE product_id = $1 AND category_id = $2",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Suppliers and inventory
    // =========================================================================

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_supplier(&self, input: &NewSupplier) -> Result<Supplier, RepositoryError> {
        sqlx::query_as::<_, Supplier>(
            r"
            INSERT INTO shop.suppliers (name, contact_email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, contact_email, phone, created_at
            ",
        )
        .bind(&input.name)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Delete a supplier. Stock levels keep their rows with the supplier cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    pub async fn delete_supplier(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.suppliers WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::from_delete)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("suppliers", id));
        }
        Ok(())
    }

    /// Create or replace a product's stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for negative counts and
    /// `RepositoryError::ForeignKey` for a missing product or supplier.
    pub async fn set_inventory(&self, input: &SetInventory) -> Result<Inventory, RepositoryError> {
        sqlx::query_as::<_, Inventory>(
            r"
            INSERT INTO shop.inventory (product_id, supplier_id, quantity_on_hand, reorder_level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT inventory_product_id_key DO UPDATE
            SET supplier_id = EXCLUDED.supplier_id,
                quantity_on_hand = EXCLUDED.quantity_on_hand,
                reorder_level = EXCLUDED.reorder_level,
                updated_at = NOW()
            RETURNING id, product_id, supplier_id, quantity_on_hand, reorder_level, updated_at
            ",
        )
        .bind(input.product_id)
        .bind(input.supplier_id)
        .bind(input.quantity_on_hand)
        .bind(input.reorder_level)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Stock level of a product, if one has been recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_inventory(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, RepositoryError> {
        let inventory = sqlx::query_as::<_, Inventory>(
            r"
            SELECT id, product_id, supplier_id, quantity_on_hand, reorder_level, updated_at
            FROM shop.inventory
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(inventory)
    }
}
