//! Inventory ledger arithmetic.
//!
//! The ledger is the single source of truth for stock; `products.stock` is a
//! derived copy refreshed in the same transaction as every ledger write.

use thiserror::Error;

/// Kind of stock movement recorded in the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Purchase,
    Sale,
    Return,
    Adjustment,
    Damage,
}

impl Movement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Return => "return",
            Self::Adjustment => "adjustment",
            Self::Damage => "damage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "sale" => Some(Self::Sale),
            "return" => Some(Self::Return),
            "adjustment" => Some(Self::Adjustment),
            "damage" => Some(Self::Damage),
            _ => None,
        }
    }

    /// Whether the movement adds to on-hand quantity. Purchases and returns
    /// add; sales, adjustments and damage subtract.
    pub fn adds_stock(&self) -> bool {
        matches!(self, Self::Purchase | Self::Return)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient stock")]
    InsufficientStock,
    #[error("Insufficient available stock")]
    InsufficientAvailable,
    #[error("Cannot release more than reserved")]
    OverRelease,
}

/// On-hand quantity not yet earmarked for an order.
pub fn available(quantity: i32, reserved: i32) -> i32 {
    quantity - reserved
}

/// Apply a movement of `qty` units to the on-hand quantity.
pub fn apply(quantity: i32, movement: Movement, qty: i32) -> Result<i32, LedgerError> {
    if movement.adds_stock() {
        Ok(quantity + qty)
    } else if quantity < qty {
        Err(LedgerError::InsufficientStock)
    } else {
        Ok(quantity - qty)
    }
}

/// Earmark `qty` units, bounded by what is currently available.
pub fn reserve(quantity: i32, reserved: i32, qty: i32) -> Result<i32, LedgerError> {
    if available(quantity, reserved) < qty {
        return Err(LedgerError::InsufficientAvailable);
    }
    Ok(reserved + qty)
}

/// Return `qty` earmarked units to the available pool.
pub fn release(reserved: i32, qty: i32) -> Result<i32, LedgerError> {
    if reserved < qty {
        return Err(LedgerError::OverRelease);
    }
    Ok(reserved - qty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_signs() {
        assert_eq!(apply(10, Movement::Purchase, 5), Ok(15));
        assert_eq!(apply(10, Movement::Return, 2), Ok(12));
        assert_eq!(apply(10, Movement::Sale, 4), Ok(6));
        assert_eq!(apply(10, Movement::Adjustment, 1), Ok(9));
        assert_eq!(apply(10, Movement::Damage, 3), Ok(7));
    }

    #[test]
    fn sale_cannot_go_negative() {
        assert_eq!(apply(2, Movement::Sale, 3), Err(LedgerError::InsufficientStock));
    }

    #[test]
    fn available_tracks_reservations() {
        assert_eq!(available(10, 4), 6);
        let reserved = reserve(10, 4, 6).unwrap();
        assert_eq!(reserved, 10);
        assert_eq!(available(10, reserved), 0);
    }

    #[test]
    fn reserve_bounded_by_available() {
        assert_eq!(reserve(10, 8, 3), Err(LedgerError::InsufficientAvailable));
    }

    #[test]
    fn release_bounded_by_reserved() {
        assert_eq!(release(2, 3), Err(LedgerError::OverRelease));
        assert_eq!(release(3, 3), Ok(0));
    }

    #[test]
    fn parse_round_trips() {
        for m in ["purchase", "sale", "return", "adjustment", "damage"] {
            assert_eq!(Movement::parse(m).unwrap().as_str(), m);
        }
        assert_eq!(Movement::parse("theft"), None);
    }
}
