//! Cart line persistence.
//!
//! The `UNIQUE (user_id, product_id)` constraint plus `ON CONFLICT`
//! upserts serialize rapid double-submissions at the row level, so a user
//! can never end up with duplicate lines for the same product.

use sqlx::{PgPool, Row, postgres::PgRow};

use sparehub_core::{CartItemId, ProductId, UserId, discounted_unit_price};

use super::RepositoryError;
use crate::models::CartLine;

/// Repository for a user's cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All cart lines for a user, joined with current product facts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query(LINES_FOR_USER_SQL)
            .bind(user_id.as_i64())
            .fetch_all(self.pool)
            .await?;

        rows.iter().map(map_cart_line).collect()
    }

    /// Current quantity of a product in the user's cart, if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<i32>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT quantity FROM cart_items
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| r.try_get("quantity")).transpose()?)
    }

    /// Add a product to the cart, incrementing the quantity if the line
    /// already exists. Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32, RepositoryError> {
        let row = sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING quantity
            ",
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(row.try_get("quantity")?)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_items
            SET quantity = $3
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Remove a line from the cart.
    ///
    /// Returns `true` if a line was removed, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_items
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of distinct lines in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(self.pool)
            .await?;

        Ok(row.try_get("n")?)
    }
}

pub(super) const LINES_FOR_USER_SQL: &str = r"
    SELECT c.id, c.user_id, c.product_id, c.quantity, c.added_at,
           p.name AS product_name, p.part_number, p.price, p.discount,
           p.stock_quantity, p.is_active
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.added_at, c.id
";

pub(super) fn map_cart_line(row: &PgRow) -> Result<CartLine, RepositoryError> {
    let price = row.try_get("price")?;
    let discount = row.try_get("discount")?;

    Ok(CartLine {
        id: CartItemId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        part_number: row.try_get("part_number")?,
        unit_price: discounted_unit_price(price, discount),
        quantity: row.try_get("quantity")?,
        stock_quantity: row.try_get("stock_quantity")?,
        is_active: row.try_get("is_active")?,
        added_at: row.try_get("added_at")?,
    })
}
