//! # Money Module
//!
//! Fixed-point monetary values with exactly two decimal places.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Cents                                        │
//! │    A price of 50.00 is stored as 5000.                              │
//! │    unit_price × quantity is exact; the order total is the exact     │
//! │    sum of its line totals at every committed state.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! `Money` serializes as a 2-decimal string (`"100.00"`), matching the
//! collaborator JSON contract. Deserialization accepts strings and JSON
//! numbers; fractional input beyond two decimals is rounded half away
//! from zero, the same rule a `toFixed(2)` producer applies.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: room for adjustments and refunds downstream
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **String serde**: fixed 2-decimal wire representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use minicrm_core::money::Money;
    ///
    /// let price = Money::from_cents(5000); // 50.00
    /// assert_eq!(price.cents(), 5000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a line quantity, or `None` when the result does not
    /// fit in `i64` cents.
    ///
    /// Exact in cents, so `line_total = unit_price.checked_multiply_quantity(qty)`
    /// already carries the 2-decimal rounding guarantee.
    ///
    /// ## Example
    /// ```rust
    /// use minicrm_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(5000); // 50.00
    /// let line_total = unit_price.checked_multiply_quantity(2).unwrap();
    /// assert_eq!(line_total.cents(), 10000); // 100.00
    /// assert!(Money::from_cents(i64::MAX).checked_multiply_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds another value, or `None` on overflow. The plain `Add` impls
    /// stay for sums of already-committed amounts.
    #[inline]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Parses a decimal string ("50", "50.0", "199.90") into Money.
    ///
    /// ## Rules
    /// - Optional leading minus
    /// - At most one decimal point
    /// - Digits beyond two decimals are rounded half away from zero
    pub fn parse(field: &str, raw: &str) -> ValidationResult<Money> {
        let s = raw.trim();
        let invalid = || ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{raw}' is not a decimal amount"),
        };

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        // First two fractional digits are cents; the third decides rounding.
        let mut frac_digits = frac.chars().map(|c| c as i64 - '0' as i64);
        let d1 = frac_digits.next().unwrap_or(0);
        let d2 = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().is_some_and(|d3| d3 >= 5);

        let mut cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(d1 * 10 + d2))
            .ok_or_else(invalid)?;
        if round_up {
            cents += 1;
        }
        if negative {
            cents = -cents;
        }

        Ok(Money(cents))
    }

    /// Converts a JSON number into Money, rounding to cents.
    fn from_f64(field: &str, value: f64) -> ValidationResult<Money> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "amount must be finite".to_string(),
            });
        }
        let cents = (value * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "amount out of range".to_string(),
            });
        }
        Ok(Money(cents as i64))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders the fixed 2-decimal form: `100.00`, `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl<'de> Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as a string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                Money::parse("amount", v).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_f64("amount", v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                v.checked_mul(100)
                    .map(Money)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Money)
                    .ok_or_else(|| E::custom("amount out of range"))
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
