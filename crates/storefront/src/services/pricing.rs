//! Pricing engine: pure quote computation over cart lines.
//!
//! All arithmetic is `Decimal`; every component of the quote is rounded to
//! currency precision independently so stored amounts satisfy
//! `total = subtotal + tax + shipping` exactly.

use rust_decimal::Decimal;
use serde::Serialize;

use sparehub_core::round_currency;

/// One line of a quote: discounted unit price and quantity.
#[derive(Debug, Clone, Copy)]
pub struct QuoteLine {
    /// Unit price after discount, at currency precision.
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Order-level totals produced by [`quote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
}

/// Compute order totals for a sequence of lines.
///
/// `subtotal = Σ unit_price * quantity`, `tax = subtotal * tax_rate`,
/// shipping is the configured flat rate. An empty line set yields a zero
/// subtotal but still carries the shipping charge; checkout rejects empty
/// carts before quoting.
#[must_use]
pub fn quote(lines: &[QuoteLine], tax_rate: Decimal, shipping_rate: Decimal) -> OrderTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();

    let subtotal = round_currency(subtotal);
    let tax_amount = round_currency(subtotal * tax_rate);
    let shipping_amount = round_currency(shipping_rate);

    OrderTotals {
        subtotal,
        tax_amount,
        shipping_amount,
        total_amount: subtotal + tax_amount + shipping_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sparehub_core::discounted_unit_price;

    const TAX_RATE: Decimal = dec!(0.18);
    const SHIPPING: Decimal = dec!(50.00);

    #[test]
    fn test_quote_single_discounted_line() {
        // price 100, discount 10%, qty 2, tax 18%, shipping 50
        let lines = [QuoteLine {
            unit_price: discounted_unit_price(dec!(100.00), dec!(10)),
            quantity: 2,
        }];

        let totals = quote(&lines, TAX_RATE, SHIPPING);

        assert_eq!(totals.subtotal, dec!(180.00));
        assert_eq!(totals.tax_amount, dec!(32.40));
        assert_eq!(totals.shipping_amount, dec!(50.00));
        assert_eq!(totals.total_amount, dec!(262.40));
    }

    #[test]
    fn test_quote_multiple_lines() {
        let lines = [
            QuoteLine {
                unit_price: dec!(19.99),
                quantity: 3,
            },
            QuoteLine {
                unit_price: dec!(4.50),
                quantity: 1,
            },
        ];

        let totals = quote(&lines, TAX_RATE, SHIPPING);

        assert_eq!(totals.subtotal, dec!(64.47));
        assert_eq!(totals.tax_amount, dec!(11.60)); // 11.6046 -> 11.60
        assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount + totals.shipping_amount
        );
    }

    #[test]
    fn test_quote_empty_cart_still_charges_shipping() {
        let totals = quote(&[], TAX_RATE, SHIPPING);

        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.shipping_amount, dec!(50.00));
        assert_eq!(totals.total_amount, dec!(50.00));
    }

    #[test]
    fn test_quote_components_sum_exactly() {
        let lines = [QuoteLine {
            unit_price: dec!(33.33),
            quantity: 7,
        }];

        let totals = quote(&lines, dec!(0.0825), dec!(12.99));

        assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount + totals.shipping_amount
        );
    }
}
