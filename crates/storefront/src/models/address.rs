//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sparehub_core::{AddressId, UserId};

/// A shipping destination owned by a user.
///
/// At most one address per user has `is_default = true`; the repository
/// clears the previous default in the same transaction that sets a new one.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}
