//! User lookups.
//!
//! This service never creates or mutates users; it reads them to resolve
//! notification recipients and the admin set.

use sqlx::{PgPool, Row, postgres::PgRow};

use sparehub_core::UserId;

use super::RepositoryError;
use crate::models::User;

/// Repository for consumed user identity.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, role, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_user(&r)).transpose()
    }

    /// All users with the `admin` role, used for order alert fan-out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admins(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, role, created_at
            FROM users
            WHERE role = 'admin'
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }
}

fn map_user(row: &PgRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        created_at: row.try_get("created_at")?,
    })
}
