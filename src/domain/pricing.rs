//! Cart total computation.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{round, TAX_RATE};

/// Subtotal, tax and grand total for a set of line items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Compute totals over `(unit price, quantity)` lines.
///
/// `subtotal = Σ price × quantity`, `tax = subtotal × 10%`,
/// `total = subtotal + tax`, each rounded to two decimals.
pub fn cart_totals(lines: &[(Decimal, i32)]) -> CartTotals {
    let subtotal = round(
        lines
            .iter()
            .fold(Decimal::ZERO, |acc, (price, qty)| acc + *price * Decimal::from(*qty)),
    );
    let tax = round(subtotal * TAX_RATE);
    CartTotals { subtotal, tax, total: subtotal + tax }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_add_up() {
        let totals = cart_totals(&[(dec!(10.00), 2), (dec!(5.50), 1)]);
        assert_eq!(totals.subtotal, dec!(25.50));
        assert_eq!(totals.tax, dec!(2.55));
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn empty_cart_is_zero() {
        assert_eq!(cart_totals(&[]), CartTotals::default());
    }

    #[test]
    fn tax_is_ten_percent_rounded() {
        let totals = cart_totals(&[(dec!(0.33), 1)]);
        assert_eq!(totals.tax, dec!(0.03));
        assert_eq!(totals.total, dec!(0.36));
    }
}
