//! Coupon rule checks and discount computation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::money::round;
use crate::models::coupon::Coupon;

/// How a coupon's `discount_value` is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// Why a coupon cannot be used for a given order.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon has expired")]
    OutsideDateWindow,
    #[error("Coupon usage limit exceeded")]
    UsageLimitReached,
    #[error("Minimum order amount of ${0} required")]
    BelowMinimum(Decimal),
    #[error("You have reached the usage limit for this coupon")]
    UserLimitReached,
}

/// Check every redemption rule against the coupon's current counters.
///
/// `user_usage` is how many times the requesting user has already redeemed
/// this coupon.
pub fn check(
    coupon: &Coupon,
    now: DateTime<Utc>,
    order_amount: Decimal,
    user_usage: i32,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.start_date || now > coupon.end_date {
        return Err(CouponRejection::OutsideDateWindow);
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }
    if order_amount < coupon.min_order_amount {
        return Err(CouponRejection::BelowMinimum(coupon.min_order_amount));
    }
    if user_usage >= coupon.user_usage_limit {
        return Err(CouponRejection::UserLimitReached);
    }
    Ok(())
}

/// Discount for an order amount: `value%` capped at `max_discount`, or a
/// flat `value`, depending on the discount type. Unknown types discount
/// nothing.
pub fn compute(coupon: &Coupon, order_amount: Decimal) -> Decimal {
    match DiscountType::parse(&coupon.discount_type) {
        Some(DiscountType::Percentage) => {
            let mut discount = order_amount * coupon.discount_value / Decimal::from(100);
            if let Some(cap) = coupon.max_discount {
                if discount > cap {
                    discount = cap;
                }
            }
            round(discount)
        }
        Some(DiscountType::Fixed) => round(coupon.discount_value),
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE20".into(),
            description: String::new(),
            discount_type: "percentage".into(),
            discount_value: dec!(20),
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            usage_count: 0,
            user_usage_limit: 1,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount() {
        assert_eq!(compute(&coupon(), dec!(100)), dec!(20));
    }

    #[test]
    fn percentage_capped_at_max() {
        let mut c = coupon();
        c.max_discount = Some(dec!(15));
        assert_eq!(compute(&c, dec!(200)), dec!(15));
    }

    #[test]
    fn fixed_discount_ignores_amount() {
        let mut c = coupon();
        c.discount_type = "fixed".into();
        c.discount_value = dec!(5);
        assert_eq!(compute(&c, dec!(9.99)), dec!(5));
    }

    #[test]
    fn below_minimum_rejected_for_any_type() {
        let mut c = coupon();
        c.min_order_amount = dec!(50);
        let now = Utc::now();
        assert_eq!(
            check(&c, now, dec!(49.99), 0),
            Err(CouponRejection::BelowMinimum(dec!(50)))
        );
        c.discount_type = "fixed".into();
        assert_eq!(
            check(&c, now, dec!(10), 0),
            Err(CouponRejection::BelowMinimum(dec!(50)))
        );
    }

    #[test]
    fn expired_coupon_rejected() {
        let mut c = coupon();
        c.end_date = Utc::now() - Duration::hours(1);
        assert_eq!(check(&c, Utc::now(), dec!(100), 0), Err(CouponRejection::OutsideDateWindow));
    }

    #[test]
    fn global_limit_enforced() {
        let mut c = coupon();
        c.usage_limit = Some(3);
        c.usage_count = 3;
        assert_eq!(check(&c, Utc::now(), dec!(100), 0), Err(CouponRejection::UsageLimitReached));
    }

    #[test]
    fn per_user_limit_enforced() {
        let c = coupon();
        assert_eq!(check(&c, Utc::now(), dec!(100), 1), Err(CouponRejection::UserLimitReached));
        assert_eq!(check(&c, Utc::now(), dec!(100), 0), Ok(()));
    }
}
