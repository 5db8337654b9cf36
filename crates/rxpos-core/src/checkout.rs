//! # Checkout Draft
//!
//! Everything the billing page holds between the first scan and the invoice:
//! the cart, the payment form and the selected customer.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutDraft                                                          │
//! │                                                                         │
//! │   add_line / set_quantity / set_discount / remove_line  ──► Cart        │
//! │   select_customer / clear_customer                      ──► customer    │
//! │   payment_mut                                           ──► payment     │
//! │                                                                         │
//! │   build_request(shop_id)                                                │
//! │        │                                                                │
//! │        ├── validate_checkout ──✗──► CheckoutError (nothing built)      │
//! │        │                                                                │
//! │        └──✓──► CheckoutRequest ──► POST /api/invoices (by the caller)  │
//! │                                                                         │
//! │   reset()  after the invoice comes back                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sending the request is not this crate's business. The caller submits it and
//! calls [`CheckoutDraft::reset`] only once the backend accepted it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine, QuantityChange};
use crate::error::{CartResult, CheckoutError};
use crate::money::Money;
use crate::pricing::{self, CartTotals};
use crate::types::{Customer, Lot, PaymentMethod, PaymentState, Product, TaxRate};
use crate::validation::validate_checkout;

// =============================================================================
// Request payload
// =============================================================================

/// One invoice line as the backend expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub medicine_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_amount: Money,
    pub tax_rate: TaxRate,
}

impl From<&CartLine> for CheckoutItem {
    fn from(line: &CartLine) -> Self {
        CheckoutItem {
            medicine_id: line.product.id.clone(),
            batch_id: line.lot.id.clone(),
            quantity: line.quantity,
            unit_price: pricing::line_unit_price(line),
            discount_amount: line.discount,
            tax_rate: line.tax_rate,
        }
    }
}

/// Body of `POST /api/invoices`.
///
/// Method-specific fields are only present for their method: the reference
/// for card / UPI / net banking, cheque number and date for cheque, due date
/// for credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shop_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    pub items: Vec<CheckoutItem>,

    pub payment_method: PaymentMethod,

    pub paid_amount: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheque_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub cheque_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

/// Amount recorded as paid.
///
/// Cash is capped at the grand total since the excess goes back as change.
/// Every other method records what was tendered.
pub fn paid_amount(payment: &PaymentState, grand_total: Money) -> Money {
    let tendered = pricing::effective_tendered(payment.amount_tendered, grand_total);
    match payment.method {
        PaymentMethod::Cash => tendered.min(grand_total),
        _ => tendered,
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Draft
// =============================================================================

/// The state of one bill being rung up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutDraft {
    cart: Cart,
    payment: PaymentState,
    customer: Option<Customer>,
}

impl CheckoutDraft {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty draft whose cart falls back to `rate` for products
    /// without a GST rate.
    pub fn with_default_tax_rate(rate: TaxRate) -> Self {
        CheckoutDraft {
            cart: Cart::with_default_tax_rate(rate),
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Adds one unit of `lot`, checking prescriptions against the selected
    /// customer.
    pub fn add_line(&mut self, product: &Product, lot: &Lot) -> CartResult<usize> {
        let has_customer = self.customer.is_some();
        self.cart.add_line(product, lot, has_customer)
    }

    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CartResult<QuantityChange> {
        self.cart.set_quantity(index, quantity)
    }

    pub fn set_discount(&mut self, index: usize, amount: Money) -> CartResult<Money> {
        self.cart.set_discount(index, amount)
    }

    pub fn remove_line(&mut self, index: usize) -> CartResult<CartLine> {
        self.cart.remove_line(index)
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    // -------------------------------------------------------------------------
    // Customer
    // -------------------------------------------------------------------------

    pub fn select_customer(&mut self, customer: Customer) {
        self.customer = Some(customer);
    }

    /// Deselects the customer. Prescription lines already in the cart stay;
    /// checkout will ask for a customer again.
    pub fn clear_customer(&mut self) -> Option<Customer> {
        self.customer.take()
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    #[inline]
    pub fn has_customer(&self) -> bool {
        self.customer.is_some()
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    pub fn payment(&self) -> &PaymentState {
        &self.payment
    }

    pub fn payment_mut(&mut self) -> &mut PaymentState {
        &mut self.payment
    }

    /// Switches the payment method, keeping whatever else was typed.
    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment.method = method;
    }

    // -------------------------------------------------------------------------
    // Derived values
    // -------------------------------------------------------------------------

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    /// Change to hand back for the current payment.
    pub fn change_due(&self) -> Money {
        pricing::change_due(
            self.payment.method,
            self.payment.amount_tendered,
            self.totals().grand_total,
        )
    }

    /// Amount still owed after the current tender.
    pub fn outstanding(&self) -> Money {
        pricing::outstanding(self.payment.amount_tendered, self.totals().grand_total)
    }

    /// Runs the checkout rules against the draft as it stands.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        validate_checkout(self.cart.lines(), &self.payment, self.has_customer())
    }

    /// Validates the draft and builds the invoice payload for `shop_id`.
    ///
    /// ## Errors
    /// The first failing checkout rule. The draft is never modified.
    pub fn build_request(&self, shop_id: &str) -> Result<CheckoutRequest, CheckoutError> {
        self.validate()?;

        let totals = self.totals();
        let method = self.payment.method;

        let payment_reference = if method.requires_reference() {
            trimmed(&self.payment.reference)
        } else {
            None
        };
        let (cheque_number, cheque_date) = if method == PaymentMethod::Cheque {
            (trimmed(&self.payment.cheque_number), self.payment.cheque_date)
        } else {
            (None, None)
        };
        let due_date = if method == PaymentMethod::Credit {
            self.payment.due_date
        } else {
            None
        };

        Ok(CheckoutRequest {
            shop_id: shop_id.to_string(),
            customer_id: self.customer.as_ref().map(|c| c.id.clone()),
            items: self.cart.lines().iter().map(CheckoutItem::from).collect(),
            payment_method: method,
            paid_amount: paid_amount(&self.payment, totals.grand_total),
            payment_reference,
            cheque_number,
            cheque_date,
            due_date,
        })
    }

    /// Starts a fresh bill: empty cart, blank cash payment, no customer.
    ///
    /// The cart keeps its configured fallback tax rate.
    pub fn reset(&mut self) {
        self.cart.clear();
        self.payment.reset();
        self.customer = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
