//! Reader reviews.

use std::collections::HashMap;

use chrono::Utc;
use common::{BookId, UserId};
use domain::Review;
use projections::ReviewView;
use store::{Store, Transaction};

use crate::error::{Result, ServiceError};

/// Records and lists ratings left on catalog entries.
#[derive(Clone)]
pub struct ReviewService<S> {
    store: S,
}

impl<S: Store> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a 1 to 5 star review. Both the user and the book must exist.
    #[tracing::instrument(skip(self, content))]
    pub async fn add_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: u8,
        content: &str,
    ) -> Result<ReviewView> {
        let mut tx = self.store.begin().await?;
        let reviewer = tx
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;
        if tx.find_book_for_update(book_id).await?.is_none() {
            return Err(ServiceError::BookNotFound(book_id));
        }

        let review = Review::new(book_id, user_id, rating, content, Utc::now())?;
        tx.insert_review(&review).await?;
        tx.commit().await?;

        metrics::counter!("reviews_added_total").increment(1);
        tracing::info!(review_id = %review.id(), "review added");
        Ok(ReviewView::new(&review, Some(&reviewer.display_name)))
    }

    /// Lists a book's reviews, newest first, with each reviewer's display name.
    pub async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<ReviewView>> {
        if self.store.find_book(book_id).await?.is_none() {
            return Err(ServiceError::BookNotFound(book_id));
        }
        let reviews = self.store.reviews_for_book(book_id).await?;

        let mut names: HashMap<UserId, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(reviews.len());
        for review in &reviews {
            if !names.contains_key(&review.user_id()) {
                let name = self
                    .store
                    .find_user(review.user_id())
                    .await?
                    .map(|profile| profile.display_name);
                names.insert(review.user_id(), name);
            }
            let name = names.get(&review.user_id()).and_then(Option::as_deref);
            views.push(ReviewView::new(review, name));
        }
        Ok(views)
    }
}
