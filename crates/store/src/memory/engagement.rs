//! Reviews, wishlists, and the audit log.

use chrono::Utc;

use shopkeep_core::{CustomerId, ProductId, ReviewId, WishlistId};

use super::{MemoryStore, check_rating};
use crate::RepositoryError;
use crate::models::{
    ChangeLogEntry, NewChangeLogEntry, NewReview, Review, Wishlist, WishlistItem,
};

impl MemoryStore {
    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Check` for a rating outside 1..=5 and
    /// `RepositoryError::ForeignKey` for a missing product or customer.
    pub fn create_review(&mut self, input: NewReview) -> Result<Review, RepositoryError> {
        self.write(|t, _| {
            let rating = check_rating("reviews_rating_check", input.rating)?;
            t.require_product(input.product_id, "reviews_product_id_fkey")?;
            t.require_customer(input.customer_id, "reviews_customer_id_fkey")?;

            let review = Review {
                id: t.seq.reviews(),
                product_id: input.product_id,
                customer_id: input.customer_id,
                rating,
                body: input.body,
                created_at: Utc::now(),
            };
            t.reviews.insert(review.id, review.clone());
            Ok(review)
        })
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub fn delete_review(&mut self, id: ReviewId) -> Result<Review, RepositoryError> {
        self.write(|t, _| {
            t.reviews
                .remove(&id)
                .ok_or_else(|| RepositoryError::not_found("reviews", id))
        })
    }

    /// Reviews of a product, oldest first.
    #[must_use]
    pub fn list_reviews(&self, product_id: ProductId) -> Vec<Review> {
        self.tables
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect()
    }

    /// Create an empty wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the customer does not exist.
    pub fn create_wishlist(
        &mut self,
        customer_id: CustomerId,
        name: &str,
    ) -> Result<Wishlist, RepositoryError> {
        self.write(|t, _| {
            t.require_customer(customer_id, "wishlists_customer_id_fkey")?;
            let wishlist = Wishlist {
                id: t.seq.wishlists(),
                customer_id,
                name: name.to_owned(),
                created_at: Utc::now(),
            };
            t.wishlists.insert(wishlist.id, wishlist.clone());
            Ok(wishlist)
        })
    }

    /// Put a product on a wishlist. Adding it again keeps the original entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the wishlist or product does
    /// not exist.
    pub fn add_to_wishlist(
        &mut self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<WishlistItem, RepositoryError> {
        self.write(|t, _| {
            if !t.wishlists.contains_key(&wishlist_id) {
                return Err(RepositoryError::foreign_key(
                    "wishlist_items_wishlist_id_fkey",
                ));
            }
            t.require_product(product_id, "wishlist_items_product_id_fkey")?;
            let item = t
                .wishlist_items
                .entry((wishlist_id, product_id))
                .or_insert_with(|| WishlistItem {
                    wishlist_id,
                    product_id,
                    added_at: Utc::now(),
                });
            Ok(item.clone())
        })
    }

    /// Take a product off a wishlist. Returns whether it was there.
    pub fn remove_from_wishlist(&mut self, wishlist_id: WishlistId, product_id: ProductId) -> bool {
        self.tables
            .wishlist_items
            .remove(&(wishlist_id, product_id))
            .is_some()
    }

    /// Delete a wishlist and its entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the wishlist does not exist.
    pub fn delete_wishlist(&mut self, id: WishlistId) -> Result<Wishlist, RepositoryError> {
        self.write(|t, _| t.delete_wishlist(id))
    }

    /// Products on a wishlist.
    #[must_use]
    pub fn list_wishlist_products(&self, wishlist_id: WishlistId) -> Vec<ProductId> {
        self.tables
            .wishlist_items
            .keys()
            .filter(|(w, _)| *w == wishlist_id)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Append an audit record. Records are never changed or removed.
    ///
    /// # Errors
    ///
    /// Infallible today; kept fallible for parity with the database backend.
    pub fn append_change(
        &mut self,
        input: NewChangeLogEntry,
    ) -> Result<ChangeLogEntry, RepositoryError> {
        self.write(|t, _| {
            let entry = ChangeLogEntry {
                id: t.seq.change_log(),
                actor: input.actor,
                entity_type: input.entity_type,
                entity_id: input.entity_id,
                action: input.action,
                payload: input.payload,
                created_at: Utc::now(),
            };
            t.change_log.push(entry.clone());
            Ok(entry)
        })
    }

    /// Audit records for one entity, oldest first.
    #[must_use]
    pub fn list_changes(&self, entity_type: &str, entity_id: &str) -> Vec<ChangeLogEntry> {
        self.tables
            .change_log
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopkeep_core::ChangeAction;

    use super::*;
    use crate::memory::test_support::{customer, product};

    #[test]
    fn test_rating_out_of_range_rejected() {
        let mut store = MemoryStore::default();
        let who = customer(&mut store, "critic@example.com");
        let what = product(&mut store, "TEE-1", 1000);

        for rating in [0, 6] {
            let err = store
                .create_review(NewReview {
                    product_id: what,
                    customer_id: who,
                    rating,
                    body: None,
                })
                .unwrap_err();
            assert!(matches!(err, RepositoryError::Check { ref constraint, .. } if constraint == "reviews_rating_check"));
        }
        assert!(store.list_reviews(what).is_empty());

        let review = store
            .create_review(NewReview {
                product_id: what,
                customer_id: who,
                rating: 5,
                body: Some("Soft.".to_owned()),
            })
            .unwrap();
        assert_eq!(review.rating.get(), 5);
    }

    #[test]
    fn test_wishlist_follows_customer_and_product() {
        let mut store = MemoryStore::default();
        let who = customer(&mut store, "wants@example.com");
        let tee = product(&mut store, "TEE-1", 1000);
        let mug = product(&mut store, "MUG-1", 500);
        let list = store.create_wishlist(who, "Birthday").unwrap();
        let first = store.add_to_wishlist(list.id, tee).unwrap();
        let again = store.add_to_wishlist(list.id, tee).unwrap();
        assert_eq!(first, again);
        store.add_to_wishlist(list.id, mug).unwrap();

        store.delete_product(mug).unwrap();
        assert_eq!(store.list_wishlist_products(list.id), vec![tee]);

        store.delete_customer(who).unwrap();
        assert!(store.list_wishlist_products(list.id).is_empty());
        assert!(store.delete_wishlist(list.id).is_err());
    }

    #[test]
    fn test_change_log_filters_by_entity() {
        let mut store = MemoryStore::default();
        for (entity_id, action) in [("1", ChangeAction::Create), ("2", ChangeAction::Create), ("1", ChangeAction::Update)] {
            store
                .append_change(NewChangeLogEntry {
                    actor: "ops".to_owned(),
                    entity_type: "orders".to_owned(),
                    entity_id: entity_id.to_owned(),
                    action,
                    payload: serde_json::json!({ "note": "test" }),
                })
                .unwrap();
        }

        let changes = store.list_changes("orders", "1");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].action, ChangeAction::Update);
        assert!(changes[0].id < changes[1].id);
    }
}
