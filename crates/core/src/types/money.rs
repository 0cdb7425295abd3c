//! Non-negative monetary amounts using decimal arithmetic.
//!
//! Every stored amount in the schema (prices, line subtotals, order totals,
//! payments) is non-negative and carries two decimal places, matching a
//! `NUMERIC(12, 2)` column.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount must not be negative (got {0})")]
    Negative(Decimal),
    /// The amount does not fit a `NUMERIC(12, 2)` column.
    #[error("amount must be less than {max} (got {value})")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
        /// Rejected value.
        value: Decimal,
    },
}

/// A non-negative amount in the store currency.
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use shopkeep_core::Money;
///
/// let price = Money::new(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "19.99");
///
/// assert!(Money::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Number of decimal places kept.
    pub const SCALE: u32 = 2;

    /// Exclusive upper bound (ten digits before the decimal point).
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    /// Create an amount, rounding to two decimal places (midpoint away from zero).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero and
    /// [`MoneyError::TooLarge`] for amounts that do not fit `NUMERIC(12, 2)`.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        let mut rounded =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded >= Self::MAX {
            return Err(MoneyError::TooLarge {
                max: Self::MAX,
                value: amount,
            });
        }
        // Pin the scale so `5` and `5.00` serialize the same way.
        rounded.rescale(Self::SCALE);
        Ok(Self(rounded))
    }

    /// Create an amount from a count of cents.
    ///
    /// # Errors
    ///
    /// Same as [`Money::new`].
    pub fn from_cents(cents: i64) -> Result<Self, MoneyError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add two amounts, failing if the result overflows the column range.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the sum does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Decimal;

    /// Adding two amounts yields a raw decimal; range checks happen when it is
    /// turned back into [`Money`].
    fn add(self, rhs: Self) -> Decimal {
        self.0 + rhs.0
    }
}

/// Sum of amounts. An empty sum is zero, never absent.
impl Sum<Money> for Decimal {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m.0)
    }
}

impl<'a> Sum<&'a Money> for Decimal {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rounds_to_cents() {
        let m = Money::new(Decimal::new(19_995, 3)).unwrap();
        assert_eq!(m.amount(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Money::new(Decimal::new(-1, 2)),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_negative_zero_accepted() {
        let neg_zero = Decimal::new(-0, 2);
        assert!(Money::new(neg_zero).unwrap().is_zero());
    }

    #[test]
    fn test_too_large_rejected() {
        assert!(matches!(
            Money::new(Decimal::new(10_000_000_000, 0)),
            Err(MoneyError::TooLarge { .. })
        ));
        assert!(Money::new(Decimal::new(999_999_999_999, 2)).is_ok());
    }

    #[test]
    fn test_display_keeps_two_places() {
        assert_eq!(Money::from_cents(500).unwrap().to_string(), "5.00");
        assert_eq!(Money::new(Decimal::new(5, 0)).unwrap().to_string(), "5.00");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Decimal = Vec::<Money>::new().into_iter().sum();
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_sum() {
        let items = [Money::from_cents(1999).unwrap(), Money::from_cents(500).unwrap()];
        let total: Decimal = items.iter().sum();
        assert_eq!(total, Decimal::new(2499, 2));
    }

    #[test]
    fn test_serde_rejects_negative() {
        let parsed: Result<Money, _> = serde_json::from_str("\"-3.00\"");
        assert!(parsed.is_err());
        let ok: Money = serde_json::from_str("\"3.10\"").unwrap();
        assert_eq!(ok, Money::from_cents(310).unwrap());
    }
}
