//! Shipping address persistence.

use sqlx::{PgPool, Row, postgres::PgRow};

use sparehub_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::Address;

/// Fields for a new address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

/// Repository for user shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address only if it is owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, full_name, phone, address_line1, address_line2,
                   city, state, postal_code, country, is_default, created_at
            FROM addresses
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id.as_i64())
        .bind(user_id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_address(&r)).transpose()
    }

    /// All addresses for a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, full_name, phone, address_line1, address_line2,
                   city, state, postal_code, country, is_default, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at
            ",
        )
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_address).collect()
    }

    /// Create an address. When `is_default` is set, the previous default is
    /// cleared in the same transaction so at most one default exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query(
                r"
                UPDATE addresses SET is_default = FALSE
                WHERE user_id = $1 AND is_default
                ",
            )
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(
            r"
            INSERT INTO addresses (user_id, full_name, phone, address_line1,
                                   address_line2, city, state, postal_code,
                                   country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, full_name, phone, address_line1, address_line2,
                      city, state, postal_code, country, is_default, created_at
            ",
        )
        .bind(user_id.as_i64())
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.is_default)
        .fetch_one(&mut *tx)
        .await?;

        let created = map_address(&row)?;
        tx.commit().await?;

        Ok(created)
    }

    /// Make an existing address the user's default, clearing the previous
    /// one atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist or
    /// isn't owned by the user.
    pub async fn set_default(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE addresses SET is_default = FALSE
            WHERE user_id = $1 AND is_default AND id <> $2
            ",
        )
        .bind(user_id.as_i64())
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r"
            UPDATE addresses SET is_default = TRUE
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id.as_i64())
        .bind(user_id.as_i64())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}

fn map_address(row: &PgRow) -> Result<Address, RepositoryError> {
    Ok(Address {
        id: AddressId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        address_line1: row.try_get("address_line1")?,
        address_line2: row.try_get("address_line2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
    })
}
