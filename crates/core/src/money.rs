//! Money value object (fixed-point, cents).
//!
//! Amounts mirror a `DECIMAL(10, 2)` column: at most two decimal places and at
//! most ten significant digits. Internally the amount is stored as whole cents
//! so arithmetic is exact.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::value_object::ValueObject;

const MAX_DIGITS: usize = 10;
const DECIMAL_PLACES: usize = 2;
const MAX_WHOLE_DIGITS: usize = MAX_DIGITS - DECIMAL_PLACES;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    #[error("A valid number is required.")]
    Invalid,

    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,

    #[error("Ensure that there are no more than 10 digits in total.")]
    TooManyDigits,

    #[error("Ensure that there are no more than 8 digits before the decimal point.")]
    TooManyWholeDigits,
}

/// Monetary amount in cents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);
    /// Largest amount a `DECIMAL(10, 2)` column holds.
    pub const MAX: Money = Money(9_999_999_999);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `self × quantity`.
    pub fn times(self, quantity: i64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// `self × quantity`, or `None` when the product leaves the column range.
    pub fn checked_times(self, quantity: i64) -> Option<Self> {
        self.0
            .checked_mul(quantity)
            .filter(|cents| cents.unsigned_abs() <= Self::MAX.0.unsigned_abs())
            .map(Self)
    }

    /// `total / quantity`, rounded half away from zero to whole cents.
    ///
    /// Returns zero when `quantity <= 0`.
    pub fn ratio_rounded(total: Money, quantity: i64) -> Money {
        if quantity <= 0 {
            return Money::ZERO;
        }
        let num = i128::from(total.0);
        let q = i128::from(quantity);
        let rounded = if num >= 0 {
            (2 * num + q) / (2 * q)
        } else {
            (2 * num - q) / (2 * q)
        };
        Money(rounded as i64)
    }

    /// Amount as a floating point number of currency units (for analytics output).
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Margin of `self` (a selling price) over `cost`, in percent.
    ///
    /// Zero when the price is zero.
    pub fn margin_percent(self, cost: Money) -> f64 {
        if self.0 == 0 {
            return 0.0;
        }
        (self.0 - cost.0) as f64 / self.0 as f64 * 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyParseError::Invalid);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::Invalid);
        }

        let whole_significant = whole.trim_start_matches('0');
        if frac.len() > DECIMAL_PLACES {
            return Err(MoneyParseError::TooManyDecimalPlaces);
        }
        if whole_significant.len() + frac.len() > MAX_DIGITS {
            return Err(MoneyParseError::TooManyDigits);
        }
        if whole_significant.len() > MAX_WHOLE_DIGITS {
            return Err(MoneyParseError::TooManyWholeDigits);
        }

        let whole_value: i64 = if whole_significant.is_empty() {
            0
        } else {
            whole_significant.parse().map_err(|_| MoneyParseError::Invalid)?
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| MoneyParseError::Invalid)? * 10,
            _ => frac.parse().map_err(|_| MoneyParseError::Invalid)?,
        };

        let cents = whole_value * 100 + frac_value;
        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Text(String),
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match MoneyRepr::deserialize(deserializer)? {
            MoneyRepr::Text(s) => s,
            MoneyRepr::Int(i) => i.to_string(),
            MoneyRepr::Float(f) => f.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
