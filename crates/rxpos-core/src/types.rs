//! # Domain Types
//!
//! Core domain types used by the counter billing screen.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Lot        │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name           │   │  batch_number   │   │  name           │       │
//! │  │  tax_rate?      │   │  expiry_date?   │   │  phone?         │       │
//! │  │  requires_rx    │   │  quantity, mrp  │   └─────────────────┘       │
//! │  └─────────────────┘   │  selling_price? │                              │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ PaymentMethod   │   │  PaymentState   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  percent        │   │  Cash  Card     │   │  method         │       │
//! │  │  12 = 12% GST   │   │  Upi   NetBank  │   │  tendered?      │       │
//! │  └─────────────────┘   │  Cheque Credit  │   │  reference ...  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backend Leniency
//! Catalog records come from a REST backend that is not always consistent:
//! ids may be numbers or strings, prices may be numbers, numeric strings or
//! null, dates may carry a time part. Deserialization absorbs all of that so
//! the pricing code only ever sees well-typed values.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{deserialize_optional_lenient, AmountVisitor, Money};

// =============================================================================
// Tax Rate
// =============================================================================

/// GST rate in whole percent (12 = 12 %).
///
/// Stored as a decimal so fractional slabs (0.25 %, 1.5 % cess) stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(type = "number")] Decimal);

impl TaxRate {
    /// Rate applied when a product carries none.
    pub const DEFAULT_PERCENT: i64 = 12;

    /// Creates a tax rate from a percentage.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Creates a tax rate from basis points (1200 = 12 %).
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        TaxRate(Decimal::new(i64::from(bps), 2))
    }

    /// The default GST slab for medicines with no configured rate.
    #[inline]
    pub fn standard() -> Self {
        TaxRate(Decimal::from(Self::DEFAULT_PERCENT))
    }

    /// Returns the rate in percent.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Zero tax rate (exempt items).
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Tax on `taxable` at this rate; `None` on overflow.
    #[inline]
    pub fn tax_on(&self, taxable: Money) -> Option<Money> {
        taxable.checked_percent(self.0)
    }

    /// Parses a percentage typed by a person ("12", "5.5").
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        crate::money::parse_decimal(text)
            .map(TaxRate)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "tax_rate".to_string(),
                reason: format!("'{}' is not a number", text.trim()),
            })
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl Serialize for TaxRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or(0.0))
    }
}

impl<'de> Deserialize<'de> for TaxRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(AmountVisitor)?
            .map(TaxRate)
            .ok_or_else(|| de::Error::custom("expected a numeric tax rate"))
    }
}

fn deserialize_optional_tax_rate<'de, D>(deserializer: D) -> Result<Option<TaxRate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer.deserialize_any(AmountVisitor)?.map(TaxRate))
}

// =============================================================================
// Lenient field helpers
// =============================================================================

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

/// Ids arrive as `"abc"` or `42`; both become strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IdVisitor)
}

/// Accepts `"2026-05-31"`, `"2026-05-31T00:00:00.000Z"` or null.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date_prefix))
}

fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// True when an optional text field holds something other than whitespace.
pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

// =============================================================================
// Product
// =============================================================================

/// A medicine from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Display name shown to the cashier and on the invoice.
    pub name: String,

    /// GST rate configured on the product, if any.
    #[serde(default, alias = "gstRate", deserialize_with = "deserialize_optional_tax_rate")]
    pub tax_rate: Option<TaxRate>,

    /// Schedule H/H1 medicines need a customer on the bill.
    #[serde(default)]
    pub requires_prescription: bool,
}

// =============================================================================
// Lot
// =============================================================================

/// One manufactured batch of a product with its own stock and pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub batch_number: String,

    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,

    /// Quantity on hand.
    #[serde(rename = "quantity", default)]
    pub available_quantity: i64,

    /// Maximum retail (list) price.
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub mrp: Option<Money>,

    /// Shop's selling price when it differs from MRP.
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub selling_price: Option<Money>,
}

impl Lot {
    /// Checks whether the batch has passed its expiry date on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Checks whether `quantity` units can come from this batch.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity <= self.available_quantity
    }
}

/// Lots the counter may bill from, first-expiry-first.
///
/// Drops empty and expired batches. Batches without an expiry date sort
/// last.
///
/// ```rust
/// use chrono::NaiveDate;
/// use rxpos_core::types::{sellable_lots, Lot};
///
/// let lot = |id: &str, qty: i64, expiry: Option<&str>| Lot {
///     id: id.into(),
///     batch_number: id.into(),
///     expiry_date: expiry.map(|d| d.parse().unwrap()),
///     available_quantity: qty,
///     mrp: None,
///     selling_price: None,
/// };
/// let today: NaiveDate = "2026-06-01".parse().unwrap();
/// let lots = vec![
///     lot("late", 5, Some("2027-01-31")),
///     lot("empty", 0, Some("2026-12-31")),
///     lot("gone", 9, Some("2026-05-31")),
///     lot("soon", 2, Some("2026-07-31")),
/// ];
/// let ids: Vec<_> = sellable_lots(&lots, today).into_iter().map(|l| l.id).collect();
/// assert_eq!(ids, ["soon", "late"]);
/// ```
pub fn sellable_lots(lots: &[Lot], today: NaiveDate) -> Vec<Lot> {
    let mut sellable: Vec<Lot> = lots
        .iter()
        .filter(|lot| lot.available_quantity > 0 && !lot.is_expired(today))
        .cloned()
        .collect();
    sellable.sort_by_key(|lot| (lot.expiry_date.is_none(), lot.expiry_date));
    sellable
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer settles the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; change may be due.
    #[default]
    Cash,
    /// Card on an external terminal; needs the transaction ID.
    Card,
    /// UPI transfer; needs the UPI reference.
    Upi,
    /// Net banking transfer; needs the bank reference.
    NetBanking,
    /// Cheque; needs cheque number and date.
    Cheque,
    /// Deferred payment against a customer account; needs a due date.
    Credit,
}

impl PaymentMethod {
    /// All methods, in the order the billing screen lists them.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::NetBanking,
        PaymentMethod::Cheque,
        PaymentMethod::Credit,
    ];

    /// Wire name, as sent to the backend.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Credit => "credit",
        }
    }

    /// Label for the reference field, for methods that carry one.
    pub const fn reference_label(&self) -> Option<&'static str> {
        match self {
            PaymentMethod::Card => Some("Card transaction ID"),
            PaymentMethod::Upi => Some("UPI reference"),
            PaymentMethod::NetBanking => Some("Net banking reference"),
            _ => None,
        }
    }

    /// Methods whose reference number is mandatory.
    #[inline]
    pub const fn requires_reference(&self) -> bool {
        self.reference_label().is_some()
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "debit" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "net_banking" | "netbanking" | "neft" => Ok(PaymentMethod::NetBanking),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            "credit" => Ok(PaymentMethod::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment State
// =============================================================================

/// Payment fields of the billing form.
///
/// Fields that do not apply to the current method are kept (switching
/// methods back and forth does not lose typing) but are ignored by
/// validation and never sent to the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub method: PaymentMethod,

    /// Amount handed over. `None` means "exactly the grand total".
    pub amount_tendered: Option<Money>,

    /// Card transaction ID / UPI / net banking reference.
    pub reference: Option<String>,

    pub cheque_number: Option<String>,

    #[ts(as = "Option<String>")]
    pub cheque_date: Option<NaiveDate>,

    /// When a credit sale must be settled.
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

impl PaymentState {
    /// Creates a payment state for `method` with everything else empty.
    pub fn with_method(method: PaymentMethod) -> Self {
        PaymentState {
            method,
            ..Default::default()
        }
    }

    /// Takes the tendered amount from the form's text box.
    ///
    /// Blank text clears the amount. Text that is not a number counts as 0,
    /// so a typo can never poison the totals.
    pub fn set_tendered_input(&mut self, text: &str) {
        self.amount_tendered = if text.trim().is_empty() {
            None
        } else {
            Some(Money::parse_input(text).unwrap_or(Money::ZERO))
        };
    }

    /// Checks that the reference field holds something.
    #[inline]
    pub fn has_reference(&self) -> bool {
        has_text(&self.reference)
    }

    /// Checks that both cheque number and cheque date are filled in.
    #[inline]
    pub fn has_cheque_details(&self) -> bool {
        has_text(&self.cheque_number) && self.cheque_date.is_some()
    }

    /// Back to a blank cash payment.
    pub fn reset(&mut self) {
        *self = PaymentState::default();
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The invoice the backend created for a checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub invoice_number: Option<String>,

    /// Amounts are lenient: the invoice exists even when the backend echoes
    /// them back as null or garbage.
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub total_amount: Option<Money>,

    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub paid_amount: Option<Money>,

    /// Outstanding amount; positive for credit and partial payments.
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub balance_amount: Option<Money>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl Invoice {
    /// Checks whether anything is left to collect.
    pub fn has_balance(&self) -> bool {
        self.balance_amount.is_some_and(|b| b.is_positive())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
