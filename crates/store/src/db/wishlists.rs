//! Wishlist repository for database operations.

use sqlx::PgPool;

use shopkeep_core::{CustomerId, ProductId, WishlistId};

use crate::RepositoryError;
use crate::models::{Wishlist, WishlistItem};

/// Repository for wishlists.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an empty wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer does not exist.
    pub async fn create(
        &self,
        customer_id: CustomerId,
        name: &str,
    ) -> Result<Wishlist, RepositoryError> {
        sqlx::query_as::<_, Wishlist>(
            r"
            INSERT INTO shop.wishlists (customer_id, name)
            VALUES ($1, $2)
            RETURNING id, customer_id, name, created_at
            ",
        )
        .bind(customer_id)
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Put a product on a wishlist. Adding it again keeps the original entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the wishlist or product does
    /// not exist.
    pub async fn add_product(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<WishlistItem, RepositoryError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row.
        sqlx::query_as::<_, WishlistItem>(
            r"
            INSERT INTO shop.wishlist_items (wishlist_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (wishlist_id, product_id)
                DO UPDATE SET added_at = shop.wishlist_items.added_at
            RETURNING wishlist_id, product_id, added_at
            ",
        )
        .bind(wishlist_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Take a product off a wishlist. Returns whether it was there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_product(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.wishlist_items WHERE wishlist_id = $1 AND product_id = $2")
                .bind(wishlist_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a wishlist and its entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the wishlist does not exist.
    pub async fn delete(&self, id: WishlistId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.wishlists WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("wishlists", id));
        }
        Ok(())
    }

    /// Products on a wishlist, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        wishlist_id: WishlistId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let products: Vec<ProductId> = sqlx::query_scalar(
            r"
            SELECT product_id
            FROM shop.wishlist_items
            WHERE wishlist_id = $1
            ORDER BY added_at, product_id
            ",
        )
        .bind(wishlist_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }
}
