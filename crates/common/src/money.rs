//! Fixed-point currency arithmetic.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing or converting monetary amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount has more than two fractional digits and cannot be
    /// represented exactly.
    #[error("amount '{0}' has more than two fractional digits")]
    Precision(String),

    /// The amount is not a well-formed decimal number.
    #[error("invalid amount: '{0}'")]
    Invalid(String),
}

/// Money amount represented in cents to avoid floating point issues.
///
/// All amounts carry exactly two fractional digits. Gateway wire formats
/// take amounts as integer minor units, which is the internal
/// representation, so [`Money::minor_units`] is exact for every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new amount from whole currency units.
    pub fn from_major(major: i64) -> Self {
        Self { cents: major * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as integer minor units for gateway wire formats.
    pub fn minor_units(&self) -> i64 {
        self.cents
    }

    /// Creates an amount from integer minor units reported by a gateway.
    pub fn from_minor_units(units: i64) -> Self {
        Self { cents: units }
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by an item quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses a decimal string such as `"26.00"` or `"10"`.
    ///
    /// Fails with [`MoneyError::Precision`] when more than two fractional
    /// digits are given, so the minor-unit conversion stays injective.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sign, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };

        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyError::Invalid(s.to_string()));
        }
        if frac.len() > 2 {
            return Err(MoneyError::Precision(s.to_string()));
        }
        // i64::parse accepts a leading sign, which must not appear inside
        // the number ("1.-5" is not an amount).
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::Invalid(s.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| MoneyError::Invalid(s.to_string()))?
        };

        let frac_cents: i64 = if frac.is_empty() {
            0
        } else {
            let parsed: i64 = frac
                .parse()
                .map_err(|_| MoneyError::Invalid(s.to_string()))?;
            if frac.len() == 1 { parsed * 10 } else { parsed }
        };

        Ok(Money {
            cents: sign * (whole * 100 + frac_cents),
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.cents.abs() / 100, self.cents.abs() % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
