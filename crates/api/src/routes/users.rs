//! Account registration, the caller's profile and account administration.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{Profile, Role};
use projections::AccountView;
use serde::Deserialize;
use store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::{Admin, Member};
use crate::error::ApiError;
use crate::extract::ApiJson;

/// Registration payload. The credential arrives already hashed.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub credential: String,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

/// POST /users: register a member account.
#[tracing::instrument(skip_all)]
pub async fn register<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = state
        .accounts
        .register(&req.display_name, &req.email, &req.credential, Role::Member)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /users/me
pub async fn me(Member(caller): Member) -> Json<Profile> {
    Json(caller)
}

/// PUT /users/me: change the caller's display name.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn update_me<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Member(caller): Member,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .accounts
        .update_profile(caller.id, &req.display_name)
        .await?;
    Ok(Json(profile))
}

/// GET /admin/users: every account, sorted by email.
#[tracing::instrument(skip_all)]
pub async fn admin_list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(_): Admin,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    Ok(Json(state.accounts.list_accounts().await?))
}

/// PUT /admin/users/:id/role
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn set_role<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<Json<AccountView>, ApiError> {
    let user_id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.set_role(user_id, &req.role).await?))
}

/// PUT /admin/users/:id/active: activate or deactivate an account.
#[tracing::instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn set_active<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Admin(admin): Admin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ActiveRequest>,
) -> Result<Json<AccountView>, ApiError> {
    let user_id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.set_active(user_id, req.active).await?))
}
