//! Money arithmetic helpers.
//!
//! All monetary amounts are `rust_decimal::Decimal` values rounded to two
//! decimal places, half-up. The payment gateway takes minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fixed sales tax rate applied to every cart subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Round a monetary amount to two decimal places, half away from zero.
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount to integer minor units (cents) for the payment gateway.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (round(amount) * Decimal::from(100)).to_i64().unwrap_or(0)
}

/// The price a buyer actually pays: the discount price when one is set.
pub fn effective_price(price: Decimal, discount_price: Option<Decimal>) -> Decimal {
    discount_price.unwrap_or(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round(dec!(1.005)), dec!(1.01));
        assert_eq!(round(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn minor_units() {
        assert_eq!(to_minor_units(dec!(19.99)), 1999);
        assert_eq!(to_minor_units(dec!(0.1)), 10);
    }

    #[test]
    fn discount_price_wins() {
        assert_eq!(effective_price(dec!(30), Some(dec!(25))), dec!(25));
        assert_eq!(effective_price(dec!(30), None), dec!(30));
    }
}
