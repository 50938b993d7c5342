//! Non-negative money amounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minor units per major unit (two decimal places).
pub const MINOR_PER_MAJOR: i64 = 100;

/// A non-negative amount of money, held in minor units (1/100 of a unit).
///
/// Balances and transfer amounts both use this type, so "balance never goes
/// negative" holds by construction: every arithmetic helper returns `None`
/// instead of producing a negative value or overflowing.
///
/// On the wire `Money` is a decimal JSON number in major units (`12.5`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Build from minor units. Negative values are rejected.
    pub fn from_minor(minor: i64) -> Option<Self> {
        (minor >= 0).then_some(Self(minor))
    }

    /// Build from a decimal amount in major units, rounded to the nearest
    /// minor unit. Rejects NaN, infinities, negatives and values that do not
    /// fit.
    pub fn from_major(major: f64) -> Option<Self> {
        if !major.is_finite() || major < 0.0 {
            return None;
        }
        let minor = (major * MINOR_PER_MAJOR as f64).round();
        if minor >= i64::MAX as f64 {
            return None;
        }
        Some(Self(minor as i64))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn to_major(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Subtract, returning `None` when the result would be negative.
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).and_then(Money::from_minor)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        Money::from_major(major)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid money amount: {major}")))
    }
}
