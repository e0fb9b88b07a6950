//! Money in minor currency units.
//!
//! All prices, subtotals and totals are integer haléře (1/100 CZK). Floating
//! point never touches an amount; [`Cents::as_decimal`] exists only for
//! presentation.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in minor units (haléře).
///
/// Serializes as a bare integer so API payloads keep the `*_cents` shape.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// The raw minor-unit value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a quantity, `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Add two amounts, `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtract, clamping the result at zero.
    #[must_use]
    pub const fn saturating_sub_floor_zero(self, other: Self) -> Self {
        let v = self.0.saturating_sub(other.0);
        if v < 0 { Self(0) } else { Self(v) }
    }

    /// The amount in major units (crowns) as a decimal with two places.
    #[must_use]
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Human-readable amount rounded to whole crowns, e.g. `"599 Kč"`.
    #[must_use]
    pub fn display_czk(self) -> String {
        let crowns = self
            .as_decimal()
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        format!("{crowns} Kč")
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Cents {
    fn from(minor_units: i64) -> Self {
        Self(minor_units)
    }
}

// SQLx support (with postgres feature), stored as BIGINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Cents {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Cents {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(v))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Cents {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_czk_rounds_to_whole_crowns() {
        assert_eq!(Cents::new(59_900).display_czk(), "599 Kč");
        assert_eq!(Cents::new(40_550).display_czk(), "406 Kč");
        assert_eq!(Cents::ZERO.display_czk(), "0 Kč");
    }

    #[test]
    fn test_checked_times() {
        assert_eq!(Cents::new(250).checked_times(3), Some(Cents::new(750)));
        assert_eq!(Cents::new(i64::MAX).checked_times(2), None);
    }

    #[test]
    fn test_floor_zero_subtraction() {
        assert_eq!(
            Cents::new(100).saturating_sub_floor_zero(Cents::new(150)),
            Cents::ZERO
        );
        assert_eq!(
            Cents::new(450).saturating_sub_floor_zero(Cents::new(45)),
            Cents::new(405)
        );
    }

    #[test]
    fn test_sum() {
        let total: Cents = [Cents::new(200), Cents::new(250)].into_iter().sum();
        assert_eq!(total, Cents::new(450));
    }
}
