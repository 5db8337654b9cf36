//! # Cart Store
//!
//! The ordered list of lines on the bill being prepared.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Cashier Action            Method                 Cart Change           │
//! │  ──────────────            ──────                 ───────────           │
//! │                                                                         │
//! │  Pick medicine + batch ──► add_line() ──────────► push or qty + 1      │
//! │                                                                         │
//! │  Edit quantity ──────────► set_quantity() ──────► qty = n / remove     │
//! │                                                                         │
//! │  Edit discount ──────────► set_discount() ──────► discount = max(0, d) │
//! │                                                                         │
//! │  Click remove ───────────► remove_line() ───────► lines.remove(i)      │
//! │                                                                         │
//! │  Checkout / cancel ──────► clear() ─────────────► lines.clear()        │
//! │                                                                         │
//! │  NOTE: a rejected mutation returns CartError and leaves the cart        │
//! │        exactly as it was.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CartError, CartResult};
use crate::money::Money;
use crate::pricing::{self, CartTotals};
use crate::types::{Lot, Product, TaxRate};

/// One medicine from one batch on the bill.
///
/// ## Snapshot Notes
/// `product` and `lot` are copies taken when the line was added. The tax
/// rate in particular is frozen here and never re-read from the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Product,
    pub lot: Lot,
    /// Always ≥ 1 and ≤ `lot.available_quantity`.
    pub quantity: i64,
    /// Absolute discount on the whole line, never negative.
    #[serde(rename = "discountAmount")]
    pub discount: Money,
    #[serde(rename = "taxRatePercent")]
    pub tax_rate: TaxRate,
}

impl CartLine {
    /// Checks whether this line is for `product_id` from `lot_id`.
    #[inline]
    pub fn is_for(&self, product_id: &str, lot_id: &str) -> bool {
        self.product.id == product_id && self.lot.id == lot_id
    }

    fn insufficient(&self, requested: i64) -> CartError {
        CartError::InsufficientStock {
            product: self.product.name.clone(),
            batch: self.lot.batch_number.clone(),
            available: self.lot.available_quantity,
            requested,
        }
    }
}

/// What `set_quantity` did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated,
    Removed,
}

/// The cart.
///
/// ## Invariants
/// - At most one line per (product id, lot id); re-adding bumps quantity
/// - Every line has 1 ≤ quantity ≤ available quantity of its lot
/// - Discounts are never negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    default_tax_rate: TaxRate,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart using the standard 12 % fallback rate.
    pub fn new() -> Self {
        Cart::with_default_tax_rate(TaxRate::standard())
    }

    /// Creates a new empty cart with a shop-specific fallback rate.
    pub fn with_default_tax_rate(default_tax_rate: TaxRate) -> Self {
        Cart {
            lines: Vec::new(),
            default_tax_rate,
        }
    }

    /// Rate copied onto lines whose product has none.
    pub fn default_tax_rate(&self) -> TaxRate {
        self.default_tax_rate
    }

    /// Adds one unit of `product` from `lot`.
    ///
    /// ## Behavior
    /// - Prescription product and no customer selected: rejected
    /// - Line for this (product, lot) exists: quantity + 1, rejected if the
    ///   batch cannot supply it
    /// - Otherwise: new line with quantity 1, no discount, tax rate frozen
    ///   from the product
    ///
    /// ## Returns
    /// Index of the line that was added or bumped.
    pub fn add_line(&mut self, product: &Product, lot: &Lot, has_customer: bool) -> CartResult<usize> {
        if product.requires_prescription && !has_customer {
            return Err(CartError::PrescriptionRequired {
                product: product.name.clone(),
            });
        }

        if let Some(index) = self.position(&product.id, &lot.id) {
            let line = &mut self.lines[index];
            let requested = line.quantity.saturating_add(1);
            if !line.lot.can_supply(requested) {
                return Err(line.insufficient(requested));
            }
            line.quantity = requested;
            return Ok(index);
        }

        let line = CartLine {
            product: product.clone(),
            lot: lot.clone(),
            quantity: 1,
            discount: Money::ZERO,
            tax_rate: pricing::resolve_tax_rate(product, self.default_tax_rate),
        };
        if !lot.can_supply(1) {
            return Err(line.insufficient(1));
        }
        self.lines.push(line);
        Ok(self.lines.len() - 1)
    }

    /// Sets the quantity of line `index`.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: the line is removed
    /// - more than the batch holds: rejected, line unchanged
    /// - otherwise: set exactly
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CartResult<QuantityChange> {
        if quantity <= 0 {
            self.remove_line(index)?;
            return Ok(QuantityChange::Removed);
        }

        let line = self.line_mut(index)?;
        if !line.lot.can_supply(quantity) {
            return Err(line.insufficient(quantity));
        }
        line.quantity = quantity;
        Ok(QuantityChange::Updated)
    }

    /// Sets the absolute discount of line `index`.
    ///
    /// Negative amounts clamp to zero. There is no upper bound: a discount
    /// above the line subtotal is kept and makes the line negative.
    ///
    /// ## Returns
    /// The discount actually stored.
    pub fn set_discount(&mut self, index: usize, amount: Money) -> CartResult<Money> {
        let line = self.line_mut(index)?;
        line.discount = amount.non_negative();
        Ok(line.discount)
    }

    /// Removes line `index`.
    pub fn remove_line(&mut self, index: usize) -> CartResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CartError::LineNotFound { index });
        }
        Ok(self.lines.remove(index))
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Line at `index`, if any.
    pub fn line(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    /// Index of the line for (product id, lot id).
    pub fn position(&self, product_id: &str, lot_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.is_for(product_id, lot_id))
    }

    /// Returns the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Checks whether any line is a prescription medicine.
    pub fn requires_prescription(&self) -> bool {
        self.lines.iter().any(|l| l.product.requires_prescription)
    }

    /// Bill totals for the current lines.
    pub fn totals(&self) -> CartTotals {
        pricing::cart_totals(&self.lines)
    }

    fn line_mut(&mut self, index: usize) -> CartResult<&mut CartLine> {
        self.lines
            .get_mut(index)
            .ok_or(CartError::LineNotFound { index })
    }
}
