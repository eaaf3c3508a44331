//! Cart aggregate: one line per (user, product).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sparehub_core::{CartItemId, ProductId, UserId};

use crate::services::pricing::OrderTotals;

/// A cart line joined with the current product facts it references.
///
/// Prices here are live catalog values; the immutable snapshot is taken at
/// placement time, not before.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub part_number: String,
    /// Discounted unit price at currency precision.
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Line total at the current unit price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart contents plus the quoted totals, as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub totals: OrderTotals,
}
