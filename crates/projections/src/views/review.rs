//! Review listing for a book page.

use chrono::{DateTime, Utc};
use common::{BookId, ReviewId};
use domain::Review;
use serde::Serialize;

/// Shown in place of a reviewer whose profile cannot be resolved.
pub const ANONYMOUS_REVIEWER: &str = "Anonymous reader";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub review_id: ReviewId,
    pub book_id: BookId,
    pub reviewer: String,
    pub rating: u8,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewView {
    pub fn new(review: &Review, reviewer: Option<&str>) -> Self {
        Self {
            review_id: review.id(),
            book_id: review.book_id(),
            reviewer: reviewer.unwrap_or(ANONYMOUS_REVIEWER).to_string(),
            rating: review.rating(),
            content: review.content().to_string(),
            created_at: review.created_at(),
        }
    }
}
