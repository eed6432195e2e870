use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A currency amount. Arithmetic is exact; the ledger stores whole cents.
///
/// Serializes as a JSON number. Deserializes from a number or a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Rounds half away from zero to the nearest cent. `None` when the
    /// result does not fit in an `i64`.
    pub fn to_cents(self) -> Option<i64> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal).rounded()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Absolute distance between two amounts.
    pub fn distance(self, other: Money) -> Money {
        (self - other).abs()
    }

    /// Rounded to the cent, half away from zero.
    pub fn rounded(self) -> Self {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(1598).to_cents(), Some(1598));
        assert_eq!(Money::from_cents(0).to_cents(), Some(0));
    }

    #[test]
    fn to_cents_rounds_sub_cent_values() {
        let m: Money = "15.989".parse().unwrap();
        assert_eq!(m.to_cents(), Some(1599));
    }

    #[test]
    fn to_cents_is_none_past_i64() {
        let huge: Money = "100000000000000000".parse().unwrap();
        assert_eq!(huge.to_cents(), None);
        assert_eq!(Money::from(Decimal::MAX).to_cents(), None);
        assert_eq!(Money::from_cents(i64::MAX).to_cents(), Some(i64::MAX));
    }

    #[test]
    fn display_has_two_places() {
        assert_eq!(Money::from_cents(1598).to_string(), "$15.98");
        assert_eq!("7".parse::<Money>().unwrap().to_string(), "$7.00");
    }

    #[test]
    fn distance_is_symmetric_and_exact() {
        let a: Money = "10.00".parse().unwrap();
        let b: Money = "10.01".parse().unwrap();
        assert_eq!(a.distance(b), Money::from_cents(1));
        assert_eq!(b.distance(a), Money::from_cents(1));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [Money::from_cents(250), Money::from_cents(1348)].iter().sum();
        assert_eq!(total, Money::from_cents(1598));
    }

    #[test]
    fn deserializes_from_json_number_and_string() {
        let n: Money = serde_json::from_str("15.98").unwrap();
        let s: Money = serde_json::from_str("\"15.98\"").unwrap();
        assert_eq!(n.to_cents(), Some(1598));
        assert_eq!(s, Money::from_cents(1598));
    }

    #[test]
    fn serializes_as_json_number() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1598)).unwrap(), "15.98");
        assert_eq!(serde_json::to_string(&Money::zero()).unwrap(), "0.0");
    }
}
