//! Reader reviews of catalog entries.

use chrono::{DateTime, Utc};
use common::{BookId, ReviewId, UserId};

use crate::catalog::CatalogError;

/// Lowest and highest accepted star rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A rating with an optional comment, left by one user on one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    id: ReviewId,
    book_id: BookId,
    user_id: UserId,
    rating: u8,
    content: String,
    created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        book_id: BookId,
        user_id: UserId,
        rating: u8,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(CatalogError::InvalidRating { rating });
        }
        Ok(Self {
            id: ReviewId::new(),
            book_id,
            user_id,
            rating,
            content: content.trim().to_string(),
            created_at,
        })
    }

    /// Rebuilds a review from stored state.
    pub fn from_parts(
        id: ReviewId,
        book_id: BookId,
        user_id: UserId,
        rating: u8,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            book_id,
            user_id,
            rating,
            content,
            created_at,
        }
    }

    pub fn id(&self) -> ReviewId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
