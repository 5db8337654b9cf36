//! # Cart Commands
//!
//! Cart manipulation for the billing screen.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Payment  │────►│ Invoice  │       │
//! │  │  Cart    │     │          │     │  Form    │     │ Created  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                 │              │
//! │                   add_to_cart                       checkout           │
//! │                   update_quantity                  (checkout.rs)       │
//! │                   apply_discount                         │              │
//! │                   remove_from_cart                       ▼              │
//! │                        │                          back to empty        │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────►                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line numbers here are 1-based, as shown to the cashier.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use rxpos_core::pricing::{line_subtotal, line_tax, line_taxable_amount, line_unit_price};
use rxpos_core::{CartError, CartLine, CartTotals, CheckoutDraft, Lot, Money, Product, QuantityChange, TaxRate};

use crate::error::{AppError, ErrorCode};
use crate::state::SessionState;

/// One cart line as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    /// 1-based position.
    pub line_no: usize,
    pub name: String,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub requires_prescription: bool,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    /// Taxable amount plus tax.
    pub total: Money,
}

impl LineView {
    fn from_line(line_no: usize, line: &CartLine) -> Self {
        let taxable = line_taxable_amount(line);
        let tax = line_tax(line);
        LineView {
            line_no,
            name: line.product.name.clone(),
            batch_number: line.lot.batch_number.clone(),
            expiry_date: line.lot.expiry_date,
            requires_prescription: line.product.requires_prescription,
            quantity: line.quantity,
            unit_price: line_unit_price(line),
            subtotal: line_subtotal(line),
            discount: line.discount,
            tax_rate: line.tax_rate,
            tax,
            total: taxable.checked_add(tax).unwrap_or(Money::ZERO),
        }
    }
}

/// Cart response including lines and totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub totals: CartTotals,
    /// Selected customer's name, if any.
    pub customer: Option<String>,
}

impl From<&CheckoutDraft> for CartView {
    fn from(draft: &CheckoutDraft) -> Self {
        CartView {
            lines: draft
                .cart()
                .lines()
                .iter()
                .enumerate()
                .map(|(i, line)| LineView::from_line(i + 1, line))
                .collect(),
            totals: draft.totals(),
            customer: draft.customer().map(|c| c.name.clone()),
        }
    }
}

/// Converts a displayed line number to a cart index.
pub(crate) fn line_index(line_no: usize) -> Result<usize, AppError> {
    line_no
        .checked_sub(1)
        .ok_or_else(|| AppError::validation("Line numbers start at 1"))
}

/// Reports a missing line by the number the cashier typed.
fn line_error(err: CartError, line_no: usize) -> AppError {
    match err {
        CartError::LineNotFound { .. } => {
            AppError::new(ErrorCode::CartError, format!("No line {} in the cart", line_no))
        }
        other => other.into(),
    }
}

/// Gets the current cart contents.
pub fn get_cart(session: &SessionState) -> CartView {
    session.with_draft(|draft| CartView::from(draft))
}

/// Adds one unit of `lot` to the cart.
///
/// ## Behavior
/// - Same medicine and batch already in the cart: quantity increases
/// - Prescription medicine without a customer: rejected, cart unchanged
/// - Price and tax rate are frozen on the line when it is created
pub fn add_to_cart(session: &SessionState, product: &Product, lot: &Lot) -> Result<CartView, AppError> {
    debug!(product_id = %product.id, lot_id = %lot.id, "add_to_cart command");

    session.with_draft_mut(|draft| {
        draft.add_line(product, lot)?;
        Ok(CartView::from(&*draft))
    })
}

/// Sets the quantity of a line. Zero or less removes it.
pub fn update_quantity(session: &SessionState, line_no: usize, quantity: i64) -> Result<CartView, AppError> {
    debug!(line_no, quantity, "update_quantity command");
    let index = line_index(line_no)?;

    session.with_draft_mut(|draft| {
        let change = draft
            .set_quantity(index, quantity)
            .map_err(|e| line_error(e, line_no))?;
        if change == QuantityChange::Removed {
            debug!(line_no, "Line removed by zero quantity");
        }
        Ok(CartView::from(&*draft))
    })
}

/// Sets the absolute discount on a line from typed text.
///
/// Negative amounts are stored as zero.
pub fn apply_discount(session: &SessionState, line_no: usize, amount: &str) -> Result<CartView, AppError> {
    let index = line_index(line_no)?;
    let amount = Money::parse_input(amount)
        .ok_or_else(|| AppError::validation(format!("'{}' is not an amount", amount.trim())))?;
    debug!(line_no, %amount, "apply_discount command");

    session.with_draft_mut(|draft| {
        draft
            .set_discount(index, amount)
            .map_err(|e| line_error(e, line_no))?;
        Ok(CartView::from(&*draft))
    })
}

/// Removes a line from the cart.
pub fn remove_from_cart(session: &SessionState, line_no: usize) -> Result<CartView, AppError> {
    debug!(line_no, "remove_from_cart command");
    let index = line_index(line_no)?;

    session.with_draft_mut(|draft| {
        draft.remove_line(index).map_err(|e| line_error(e, line_no))?;
        Ok(CartView::from(&*draft))
    })
}

/// Abandons the bill: cart, payment and customer are all cleared.
pub fn clear_cart(session: &SessionState) -> CartView {
    debug!("clear_cart command");
    session.with_draft_mut(|draft| {
        draft.reset();
        CartView::from(&*draft)
    })
}
