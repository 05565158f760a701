//! Reader reviews of a book.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::BookId;
use projections::ReviewView;
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::Member;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub content: String,
}

/// GET /books/:id/reviews: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReviewView>>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.reviews.reviews_for_book(book_id).await?))
}

/// POST /books/:id/reviews: rate a book from 1 to 5.
#[tracing::instrument(skip_all, fields(user_id = %caller.id, book_id = %id))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>), ApiError> {
    let book_id: BookId = parse_id(&id)?;
    let review = state
        .reviews
        .add_review(caller.id, book_id, req.rating, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
