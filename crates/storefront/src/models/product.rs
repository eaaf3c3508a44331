//! Catalog product facts consumed by cart and checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sparehub_core::{ProductId, discounted_unit_price};

/// A spare part in the catalog.
///
/// From this service's perspective the catalog is read-only apart from the
/// stock decrement performed inside the placement transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub part_number: String,
    pub price: Decimal,
    /// Discount percentage in `[0, 100]`.
    pub discount: Decimal,
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Effective unit price after discount, at currency precision.
    #[must_use]
    pub fn discounted_price(&self) -> Decimal {
        discounted_unit_price(self.price, self.discount)
    }

    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, discount: Decimal, stock: i32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Brake Pad Set".to_owned(),
            part_number: "BP-1001".to_owned(),
            price,
            discount,
            stock_quantity: stock,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_discounted_price() {
        assert_eq!(product(dec!(100.00), dec!(10), 5).discounted_price(), dec!(90.00));
        assert_eq!(product(dec!(100.00), dec!(0), 5).discounted_price(), dec!(100.00));
    }

    #[test]
    fn test_is_in_stock() {
        assert!(product(dec!(1), dec!(0), 1).is_in_stock());
        assert!(!product(dec!(1), dec!(0), 0).is_in_stock());
    }
}
