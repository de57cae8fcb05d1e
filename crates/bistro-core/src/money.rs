//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    8.99 * 2 + 3.99 = 21.970000000000002  ❌                             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    899 * 2 + 399 = 2197 cents  ✅                                       │
//! │                                                                         │
//! │  Decimal text ("8.99") is parsed straight into cents on the way in,     │
//! │  and cents are rendered as a decimal number on the way out.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::money::Money;
//!
//! let price = Money::from_cents(899);
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 1798);
//!
//! let parsed = Money::parse_decimal("3.99").unwrap();
//! assert_eq!((line + parsed).to_decimal(), 21.97);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::error::ValidationError;

/// Largest absolute amount accepted from decimal input (one trillion).
///
/// Keeps `cents as f64` exact and leaves headroom for quantity math.
pub const MAX_DECIMAL_CENTS: i64 = 100_000_000_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  MenuItem.price_cents ──► OrderItem.price_cents ──► OrderItem.subtotal  │
/// │                                                          │              │
/// │                                      Order.total_cents ◄─┘              │
/// │                                            │                            │
/// │                          BillingRecord.total_amount_cents               │
/// │                                            │                            │
/// │                               Dashboard total_sales_today               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(899);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 1798);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Returns the value as a decimal number for JSON output.
    ///
    /// Exact for every amount below [`MAX_DECIMAL_CENTS`].
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parses decimal text such as `"8.99"`, `"12"` or `"-0.5"`.
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - At least one integer digit
    /// - At most two fractional digits
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("8.99").unwrap().cents(), 899);
    /// assert_eq!(Money::parse_decimal("12").unwrap().cents(), 1200);
    /// assert!(Money::parse_decimal("1.999").is_err());
    /// ```
    pub fn parse_decimal(text: &str) -> Result<Money, ValidationError> {
        parse_hundredths(text, "amount").map(Money)
    }

    /// Converts a JSON number into cents.
    ///
    /// Rejects values that are not a whole number of cents (e.g. `1.999`)
    /// and values that are not finite.
    pub fn from_decimal_f64(value: f64) -> Result<Money, ValidationError> {
        hundredths_from_f64(value, "amount").map(Money)
    }
}

// =============================================================================
// Decimal Helpers
// =============================================================================

/// Parses a decimal string into hundredths (cents, or basis points for
/// percentages).
pub(crate) fn parse_hundredths(text: &str, field: &str) -> Result<i64, ValidationError> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid(field, "must be a decimal number"));
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid(field, "must be a decimal number"));
    }
    if fraction.len() > 2 {
        return Err(ValidationError::invalid(
            field,
            "must have at most 2 decimal places",
        ));
    }
    if unsigned.ends_with('.') {
        return Err(ValidationError::invalid(field, "must be a decimal number"));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| ValidationError::invalid(field, "is too large"))?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().unwrap_or(0) * 10,
        _ => fraction.parse::<i64>().unwrap_or(0),
    };

    let magnitude = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(fraction))
        .filter(|m| *m <= MAX_DECIMAL_CENTS)
        .ok_or_else(|| ValidationError::invalid(field, "is too large"))?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Converts a float into hundredths, rejecting anything finer than 0.01.
pub(crate) fn hundredths_from_f64(value: f64, field: &str) -> Result<i64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }

    let scaled = value * 100.0;
    let rounded = scaled.round();
    if rounded.abs() > MAX_DECIMAL_CENTS as f64 {
        return Err(ValidationError::invalid(field, "is too large"));
    }
    // 8.99 * 100.0 == 898.9999999999999, so allow representation noise.
    if (scaled - rounded).abs() > 1e-6 {
        return Err(ValidationError::invalid(
            field,
            "must have at most 2 decimal places",
        ));
    }

    Ok(rounded as i64)
}

// =============================================================================
// Decimal Serde
// =============================================================================

/// Serde adapter that writes [`Money`] as a decimal JSON number and reads
/// it from either a number or a decimal string.
///
/// ## Example
/// ```rust
/// use bistro_core::money::Money;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Line {
///     #[serde(with = "bistro_core::money::decimal")]
///     price: Money,
/// }
///
/// let line: Line = serde_json::from_str(r#"{"price": "8.99"}"#).unwrap();
/// assert_eq!(line.price.cents(), 899);
/// assert_eq!(serde_json::to_string(&line).unwrap(), r#"{"price":8.99}"#);
/// ```
pub mod decimal {
    use super::Money;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_decimal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }

    struct MoneyVisitor;

    impl<'de> Visitor<'de> for MoneyVisitor {
        type Value = Money;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount as a number or string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
            v.checked_mul(100)
                .filter(|c| c.abs() <= super::MAX_DECIMAL_CENTS)
                .map(Money::from_cents)
                .ok_or_else(|| E::custom("amount is too large"))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
            let v = i64::try_from(v).map_err(|_| E::custom("amount is too large"))?;
            self.visit_i64(v)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
            Money::from_decimal_f64(v).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
            Money::parse_decimal(v).map_err(E::custom)
        }
    }

    /// Same as the parent module, for `Option<Money>` fields.
    pub mod option {
        use super::Money;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Money>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(money) => serializer.serialize_some(&money.to_decimal()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Money>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] Money);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(m)| m))
        }
    }
}

// =============================================================================
// Rate (percentages)
// =============================================================================

/// A percentage stored in basis points (1 bps = 0.01%).
///
/// Used for the account's tax rate and default tip. `1500` bps is `15.00%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a stored column, clamping into `0..=u32::MAX`.
    #[inline]
    pub fn from_stored(bps: i64) -> Self {
        Rate(bps.clamp(0, u32::MAX as i64) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (`15.0` for 1500 bps).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Parses a percentage with at most two decimals (`"8.25"` is 825 bps).
    pub fn parse_percent(text: &str) -> Result<Rate, ValidationError> {
        Self::from_hundredths(parse_hundredths(text, "rate")?)
    }

    /// Converts a JSON percentage number into basis points.
    pub fn from_percent_f64(value: f64) -> Result<Rate, ValidationError> {
        Self::from_hundredths(hundredths_from_f64(value, "rate")?)
    }

    fn from_hundredths(bps: i64) -> Result<Rate, ValidationError> {
        if bps < 0 {
            return Err(ValidationError::Negative {
                field: "rate".to_string(),
            });
        }
        u32::try_from(bps)
            .map(Rate)
            .map_err(|_| ValidationError::invalid("rate", "is too large"))
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

/// Serde adapter that writes [`Rate`] as a percentage number and reads it
/// from a number or a decimal string.
pub mod percent {
    use super::Rate;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Rate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.percentage())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rate, D::Error> {
        deserializer.deserialize_any(RateVisitor)
    }

    struct RateVisitor;

    impl<'de> Visitor<'de> for RateVisitor {
        type Value = Rate;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a percentage as a number or string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rate, E> {
            Rate::from_percent_f64(v as f64).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rate, E> {
            Rate::from_percent_f64(v as f64).map_err(E::custom)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rate, E> {
            Rate::from_percent_f64(v).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Rate, E> {
            Rate::parse_percent(v).map_err(E::custom)
        }
    }

    /// Same as the parent module, for `Option<Rate>` fields.
    pub mod option {
        use super::Rate;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Rate>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] Rate);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(r)| r))
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as a plain decimal (`"21.97"`); currency symbols are a
/// dashboard concern since each account picks its own currency.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
