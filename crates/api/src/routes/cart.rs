//! The caller's cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{BookId, CartItemId};
use domain::CartItem;
use projections::CartView;
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::Member;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub book_id: BookId,
    pub quantity: u32,
}

/// GET /cart: the caller's cart at current prices.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn view<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.view(caller.id).await?))
}

/// PUT /cart/items: add a book or replace its quantity.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn put_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    ApiJson(req): ApiJson<CartItemRequest>,
) -> Result<Json<CartItem>, ApiError> {
    let item = state
        .cart
        .add_or_update(caller.id, req.book_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /cart/items/:id: drop one line.
#[tracing::instrument(skip_all, fields(user_id = %caller.id, cart_item_id = %id))]
pub async fn remove_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cart_item_id: CartItemId = parse_id(&id)?;
    state.cart.remove_item(caller.id, cart_item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
