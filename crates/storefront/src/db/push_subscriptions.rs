//! Push subscription persistence.

use sqlx::{PgPool, Row, postgres::PgRow};

use sparehub_core::{SubscriptionId, UserId};

use super::RepositoryError;
use crate::models::PushSubscription;

/// Repository for Web Push subscriptions.
pub struct PushSubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PushSubscriptionRepository<'a> {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a subscription, idempotent on (user, endpoint).
    ///
    /// Re-subscribing an existing endpoint refreshes its keys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<PushSubscription, RepositoryError> {
        let row = sqlx::query(
            r"
            INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, endpoint)
            DO UPDATE SET p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth
            RETURNING id, user_id, endpoint, p256dh, auth, created_at
            ",
        )
        .bind(user_id.as_i64())
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .fetch_one(self.pool)
        .await?;

        map_subscription(&row)
    }

    /// All subscriptions for a user (one per registered device).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, endpoint, p256dh, auth, created_at
            FROM push_subscriptions
            WHERE user_id = $1
            ORDER BY created_at
            ",
        )
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_subscription).collect()
    }

    /// Remove a subscription by its endpoint.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        endpoint: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM push_subscriptions
            WHERE user_id = $1 AND endpoint = $2
            ",
        )
        .bind(user_id.as_i64())
        .bind(endpoint)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Purge a dead subscription after the transport reported it gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge(&self, id: SubscriptionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

fn map_subscription(row: &PgRow) -> Result<PushSubscription, RepositoryError> {
    Ok(PushSubscription {
        id: SubscriptionId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        endpoint: row.try_get("endpoint")?,
        p256dh: row.try_get("p256dh")?,
        auth: row.try_get("auth")?,
        created_at: row.try_get("created_at")?,
    })
}
