//! Percent discount codes.
//!
//! Codes are compared case-insensitively by storing and looking them up in
//! their upper-cased, trimmed form. The arithmetic here is the single source
//! of truth for how much a code takes off a subtotal.

use serde::{Deserialize, Serialize};

use crate::Cents;

/// Smallest accepted percentage.
pub const MIN_PERCENT: u8 = 1;
/// Largest accepted percentage.
pub const MAX_PERCENT: u8 = 100;

/// Errors raised when defining a new discount code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountError {
    /// The code is blank after trimming.
    #[error("discount code cannot be empty")]
    EmptyCode,
    /// The percentage is outside `1..=100`.
    #[error("discount percent must be between {MIN_PERCENT} and {MAX_PERCENT}")]
    PercentOutOfRange,
}

/// Normalize user input into the stored code form.
///
/// ```
/// assert_eq!(drive_core::discount::normalize_code("  drive10 "), "DRIVE10");
/// ```
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// An active discount that can be applied to a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    code: String,
    percent: u8,
}

impl Discount {
    /// Build a discount, normalizing the code and checking the percentage.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError`] for a blank code or a percentage outside
    /// `1..=100`.
    pub fn new(code: &str, percent: u8) -> Result<Self, DiscountError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(DiscountError::EmptyCode);
        }
        if !(MIN_PERCENT..=MAX_PERCENT).contains(&percent) {
            return Err(DiscountError::PercentOutOfRange);
        }
        Ok(Self { code, percent })
    }

    /// The normalized code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The percentage taken off.
    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.percent
    }

    /// Apply to a subtotal.
    ///
    /// The discount amount is `subtotal × percent / 100` rounded half up to
    /// the nearest minor unit; the total never drops below zero.
    #[must_use]
    pub fn apply(&self, subtotal: Cents) -> AppliedDiscount {
        let amount = Cents::new(percent_of(subtotal.as_i64(), i64::from(self.percent)));
        AppliedDiscount {
            code: self.code.clone(),
            percent: self.percent,
            amount,
            total: subtotal.saturating_sub_floor_zero(amount),
        }
    }
}

/// Result of applying a [`Discount`] to a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub percent: u8,
    pub amount: Cents,
    pub total: Cents,
}

/// `round(value × percent / 100)` with halves rounded up, in integers.
fn percent_of(value: i64, percent: i64) -> i64 {
    let scaled = i128::from(value) * i128::from(percent);
    let rounded = (scaled * 2 + 100).div_euclid(200);
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_percent_of_450() {
        let applied = Discount::new("drive10", 10).unwrap().apply(Cents::new(450));
        assert_eq!(applied.code, "DRIVE10");
        assert_eq!(applied.amount, Cents::new(45));
        assert_eq!(applied.total, Cents::new(405));
    }

    #[test]
    fn test_rounds_half_up() {
        // 15% of 10 = 1.5 -> 2
        let applied = Discount::new("X", 15).unwrap().apply(Cents::new(10));
        assert_eq!(applied.amount, Cents::new(2));
        // 15% of 9 = 1.35 -> 1
        let applied = Discount::new("X", 15).unwrap().apply(Cents::new(9));
        assert_eq!(applied.amount, Cents::new(1));
    }

    #[test]
    fn test_full_discount_floors_at_zero() {
        let applied = Discount::new("FREE", 100).unwrap().apply(Cents::new(59_900));
        assert_eq!(applied.total, Cents::ZERO);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        assert_eq!(Discount::new("  ", 10), Err(DiscountError::EmptyCode));
        assert_eq!(
            Discount::new("ZERO", 0),
            Err(DiscountError::PercentOutOfRange)
        );
        assert_eq!(
            Discount::new("HUGE", 101),
            Err(DiscountError::PercentOutOfRange)
        );
    }
}
