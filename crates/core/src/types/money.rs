//! Decimal money helpers.
//!
//! All monetary amounts are `rust_decimal::Decimal`. Floating point is
//! never used for currency; persisted amounts carry two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for stored currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Round an amount to currency precision, midpoint away from zero.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit price after applying a percentage discount in `[0, 100]`.
///
/// `price * (1 - discount / 100)`, rounded to currency precision.
/// A zero discount returns the price unchanged (already at scale).
#[must_use]
pub fn discounted_unit_price(price: Decimal, discount_percent: Decimal) -> Decimal {
    if discount_percent.is_zero() {
        return price;
    }
    let factor = Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED;
    round_currency(price * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(dec!(10.005)), dec!(10.01));
        assert_eq!(round_currency(dec!(10.004)), dec!(10.00));
        assert_eq!(round_currency(dec!(32.4)), dec!(32.4));
    }

    #[test]
    fn test_discounted_unit_price() {
        assert_eq!(discounted_unit_price(dec!(100.00), dec!(10)), dec!(90.00));
        assert_eq!(discounted_unit_price(dec!(100.00), dec!(0)), dec!(100.00));
        assert_eq!(discounted_unit_price(dec!(100.00), dec!(100)), dec!(0.00));
        // 19.99 * 0.85 = 16.9915 -> 16.99
        assert_eq!(discounted_unit_price(dec!(19.99), dec!(15)), dec!(16.99));
        // Midpoint rounds away from zero: 33.30 * 0.75 = 24.975 -> 24.98
        assert_eq!(discounted_unit_price(dec!(33.30), dec!(25)), dec!(24.98));
    }
}
