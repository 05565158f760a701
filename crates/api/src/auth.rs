//! Caller identity extractors.
//!
//! Authentication happens in front of this service; by the time a request
//! arrives the caller's user id sits in the `x-user-id` header. Deactivated
//! accounts are refused here, before any handler runs.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::Profile;
use orders::ServiceError;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Any registered caller.
#[derive(Debug, Clone)]
pub struct Member(pub Profile);

/// A caller whose profile has the admin role.
#[derive(Debug, Clone)]
pub struct Admin(pub Profile);

async fn resolve<S: Store + Clone + 'static>(
    parts: &Parts,
    state: &AppState<S>,
) -> Result<Profile, ApiError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
    let user_id: UserId = raw
        .parse()
        .map_err(|_| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))?;

    match state.accounts.active_profile(user_id).await {
        Ok(profile) => Ok(profile),
        Err(ServiceError::UserNotFound(_)) => {
            Err(ApiError::Unauthorized(format!("Unknown user {user_id}")))
        }
        Err(ServiceError::AccountInactive(_)) => {
            tracing::warn!(user_id = %user_id, "deactivated account refused");
            Err(ApiError::Forbidden("Account is deactivated".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

impl<S: Store + Clone + 'static> FromRequestParts<Arc<AppState<S>>> for Member {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(Member)
    }
}

impl<S: Store + Clone + 'static> FromRequestParts<Arc<AppState<S>>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let profile = resolve(parts, state).await?;
        if !profile.is_admin() {
            tracing::warn!(user_id = %profile.id, "non-admin caller on admin route");
            return Err(ApiError::Forbidden("Administrator role required".to_string()));
        }
        Ok(Admin(profile))
    }
}
