//! Web Push subscriptions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sparehub_core::{SubscriptionId, UserId};

/// A browser push subscription registered by a user's device.
///
/// A user may hold several (one per device/browser). Dead endpoints are
/// purged when the push transport reports them gone.
#[derive(Debug, Clone, Serialize)]
pub struct PushSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}
