//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    parseFloat("abc") = NaN → poisons every total it touches             │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    MRP 12.50 × 3 = 37.50 exactly                                       │
//! │    12% GST on 37.50 = 4.5000 (kept unrounded until display)            │
//! │    No NaN, no Infinity: overflow is detected and defused to 0          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Rule
//! Arithmetic NEVER rounds. Per-line GST is summed at full precision and only
//! [`Money::rounded`] / `Display` round to 2 decimal places for the screen.
//!
//! ## Usage
//! ```rust
//! use rxpos_core::money::Money;
//!
//! let mrp = Money::from_minor(1250); // 12.50
//! let line = mrp.checked_mul_quantity(3).unwrap();
//! assert_eq!(line, Money::from_minor(3750));
//! assert_eq!(line.to_string(), "37.50");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

/// Decimal places used when showing money to people.
pub const DISPLAY_DECIMALS: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the shop's base currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative values are legal (discounts larger than the
///   line subtotal propagate as negative taxable amounts)
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serialized as a JSON number**, accepted as a number or numeric string
///
/// ## Where Money is Used
/// ```text
/// Lot.selling_price / Lot.mrp ──► CartLine unit price ──► line subtotal
///                                                            │
///                          discount ──► taxable ──► GST ─────┤
///                                                            ▼
///                                                     CartTotals.grand_total
///                                                            │
///                                     PaymentState.amount_tendered ──► change
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates money from minor units (paise).
    ///
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).to_string(), "10.99");
    /// assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, DISPLAY_DECIMALS))
    }

    /// Creates money from whole currency units.
    #[inline]
    pub fn from_major(major: i64) -> Self {
        Money(Decimal::from(major))
    }

    /// Returns the exact decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative amounts to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Money::ZERO
        } else {
            self
        }
    }

    /// Addition that reports overflow instead of panicking.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtraction that reports overflow instead of panicking.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// let strip = Money::from_minor(299);
    /// assert_eq!(strip.checked_mul_quantity(3), Some(Money::from_minor(897)));
    /// ```
    #[inline]
    pub fn checked_mul_quantity(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    /// Applies a percentage to this amount without rounding.
    ///
    /// `percent` is in whole percent: 12 means 12 %.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use rxpos_core::money::Money;
    ///
    /// let taxable = Money::from_major(200);
    /// assert_eq!(taxable.checked_percent(Decimal::from(12)), Some(Money::from_major(24)));
    /// ```
    pub fn checked_percent(self, percent: Decimal) -> Option<Money> {
        self.0
            .checked_mul(percent)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(Money)
    }

    /// Rounds to display precision (2 dp, half away from zero).
    ///
    /// Only called at the edge: receipts, screens, never mid-calculation.
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Parses free-text form input ("150", " 99.5 ", "1e3").
    ///
    /// Returns `None` for blank or non-numeric text.
    ///
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// assert_eq!(Money::parse_input("150"), Some(Money::from_major(150)));
    /// assert_eq!(Money::parse_input("abc"), None);
    /// assert_eq!(Money::parse_input("   "), None);
    /// ```
    pub fn parse_input(text: &str) -> Option<Money> {
        parse_decimal(text).map(Money)
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Parses plain or scientific decimal notation.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Converts a float through its shortest round-trip text so 0.1 stays 0.1.
pub(crate) fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    parse_decimal(&value.to_string())
}

/// Visitor accepting anything a backend might put in a numeric field.
///
/// Numbers and numeric strings become `Some`; null, booleans, garbage
/// strings, objects and arrays become `None`.
pub(crate) struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Option<Decimal>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(decimal_from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(parse_decimal(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

/// Lenient deserializer for optional price fields.
///
/// Use with `#[serde(default, deserialize_with = "...")]`: a missing, null or
/// non-numeric value is simply "no price".
pub fn deserialize_optional_lenient<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer.deserialize_any(AmountVisitor)?.map(Money))
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount at display precision, without a currency symbol.
/// Symbol and locale are the UI's concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or(0.0))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(AmountVisitor)?
            .map(Money)
            .ok_or_else(|| de::Error::custom("expected a numeric amount"))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
