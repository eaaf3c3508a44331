//! Push subscription route handlers.
//!
//! The browser registers its service-worker subscription here; the VAPID
//! public key endpoint feeds `pushManager.subscribe` on the client.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::PushSubscriptionRepository;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Keys block of a browser `PushSubscription`.
#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Body for subscribe.
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Body for unsubscribe.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub endpoint: String,
}

/// GET /notifications/vapid-public-key - key for browser subscription.
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "public_key": state.config().push.vapid_public_key }))
}

/// POST /notifications/subscribe - register a device endpoint.
///
/// Idempotent: re-subscribing an existing endpoint refreshes its keys.
#[instrument(skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn subscribe(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SubscribeBody>,
) -> Result<Json<Value>> {
    if body.endpoint.trim().is_empty() {
        return Err(AppError::BadRequest("endpoint must not be empty".to_string()));
    }

    PushSubscriptionRepository::new(state.pool())
        .upsert(user.0.id, &body.endpoint, &body.keys.p256dh, &body.keys.auth)
        .await?;

    Ok(Json(json!({ "subscribed": true })))
}

/// POST /notifications/unsubscribe - remove a device endpoint.
#[instrument(skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UnsubscribeBody>,
) -> Result<Json<Value>> {
    let removed = PushSubscriptionRepository::new(state.pool())
        .remove(user.0.id, &body.endpoint)
        .await?;

    Ok(Json(json!({ "unsubscribed": removed })))
}
