//! Consumed user identity.
//!
//! Account management lives outside this service; only the fields needed
//! for notification recipients and admin checks are read here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sparehub_core::UserId;

/// A storefront user as this service sees it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the user belongs to the admin set.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        User {
            id: UserId::new(1),
            name: "Test".to_owned(),
            email: "test@example.com".to_owned(),
            role: role.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(user("admin").is_admin());
        assert!(!user("customer").is_admin());
    }
}
