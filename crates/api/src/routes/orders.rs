//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::CheckoutRequest;
use orders::CheckoutReceipt;
use projections::{OrderDetail, OrderSummary};
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::{Admin, Member};
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// POST /checkout: turn the caller's cart into an order.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
    let receipt = state.orders.checkout(caller.id, &req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.orders.list_orders(Some(caller.id)).await?))
}

/// GET /orders/:id: one of the caller's orders.
#[tracing::instrument(skip_all, fields(user_id = %caller.id, order_id = %id))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let detail = state
        .orders
        .get_order_detail(order_id, Some(caller.id))
        .await?;
    Ok(Json(detail))
}

/// GET /admin/orders: every order, newest first.
#[tracing::instrument(skip_all)]
pub async fn admin_list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(_): Admin,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.orders.list_orders(None).await?))
}

/// GET /admin/orders/:id: any order.
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn admin_get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(_): Admin,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.get_order_detail(order_id, None).await?))
}

/// PUT /admin/orders/:id/status: change status; paid orders cannot be cancelled.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.update_status(order_id, &req.status).await?))
}

/// PUT /admin/orders/:id/status/override: change status, cancelling paid orders too.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn force_update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let detail = state
        .orders
        .force_update_status(order_id, &req.status)
        .await?;
    Ok(Json(detail))
}
