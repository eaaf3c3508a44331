//! Catalog product reads.
//!
//! Stock decrements happen inside the order placement transaction in
//! [`super::orders`], not here.

use sqlx::{PgPool, Row, postgres::PgRow};

use sparehub_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

/// Repository for catalog facts.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, name, part_number, price, discount, stock_quantity,
                   description, is_active, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_product(&r)).transpose()
    }

    /// Get an active product by ID.
    ///
    /// Deactivated products are invisible to the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get_by_id(id).await?.filter(|p| p.is_active))
    }
}

pub(super) fn map_product(row: &PgRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        part_number: row.try_get("part_number")?,
        price: row.try_get("price")?,
        discount: row.try_get("discount")?,
        stock_quantity: row.try_get("stock_quantity")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
