//! Product rating aggregation.

use rust_decimal::Decimal;

use super::money::round;

/// Arithmetic mean of review ratings, zero when there are none.
pub fn average(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: i32 = ratings.iter().sum();
    round(Decimal::from(sum) / Decimal::from(ratings.len() as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mean_of_ratings() {
        assert_eq!(average(&[4, 5]), dec!(4.50));
        assert_eq!(average(&[1, 2, 5]), dec!(2.67));
    }

    #[test]
    fn no_reviews_means_zero() {
        assert_eq!(average(&[]), Decimal::ZERO);
    }
}
