//! Review repository for database operations.

use sqlx::PgPool;

use shopkeep_core::{ProductId, ReviewId};

use crate::RepositoryError;
use crate::models::{NewReview, Review};

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a rating outside 1..=5 and
    /// `RepositoryError::ForeignKey` for a missing product or customer.
    pub async fn create(&self, input: &NewReview) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            INSERT INTO shop.reviews (product_id, customer_id, rating, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, customer_id, rating, body, created_at
            ",
        )
        .bind(input.product_id)
        .bind(input.customer_id)
        .bind(input.rating)
        .bind(&input.body)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("reviews", id));
        }
        Ok(())
    }

    /// Reviews of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            r"
            SELECT id, product_id, customer_id, rating, body, created_at
            FROM shop.reviews
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }
}
