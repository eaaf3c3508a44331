//! Identity extractors.
//!
//! Authentication happens upstream (a gateway terminates the session and
//! forwards the authenticated user ID in `X-User-Id`); these extractors
//! resolve that header against the `users` table. A missing or unknown ID
//! is rejected with `401`, a non-admin hitting an admin route with `403`.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use sparehub_core::UserId;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct CurrentUser(pub User);

/// Extractor that additionally requires the admin role.
pub struct AdminUser(pub User);

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing user identity".to_string()))?;

    let id = raw
        .parse::<i64>()
        .map(UserId::new)
        .map_err(|_| AppError::Unauthorized("malformed user identity".to_string()))?;

    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}
