//! # Pricing Engine
//!
//! Pure functions from cart lines to bill totals.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per line                                                               │
//! │                                                                         │
//! │  unit price = selling_price ?? mrp ?? 0          (resolve_unit_price)  │
//! │  subtotal   = unit price × quantity                                    │
//! │  taxable    = subtotal − discount                (may go negative)     │
//! │  tax        = taxable × rate / 100               (no rounding)         │
//! │                                                                         │
//! │  Cart                                                                   │
//! │                                                                         │
//! │  subtotal      = Σ line subtotal                                       │
//! │  totalDiscount = Σ discount                                            │
//! │  taxableTotal  = subtotal − totalDiscount                              │
//! │  totalTax      = Σ line tax                                            │
//! │  grandTotal    = taxableTotal + totalTax                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow Guard
//! Every line value and every aggregate falls back to zero if the decimal
//! arithmetic overflows. One absurd line can blank its own figures but can
//! never make the whole bill unrepresentable.
//!
//! ## Example
//! ```rust
//! use rxpos_core::pricing::cart_totals;
//! use rxpos_core::{Cart, Lot, Money, Product};
//!
//! let product = Product {
//!     id: "p1".into(),
//!     name: "Pan 40".into(),
//!     tax_rate: None, // default 12%
//!     requires_prescription: false,
//! };
//! let lot = Lot {
//!     id: "b1".into(),
//!     batch_number: "PN01".into(),
//!     expiry_date: None,
//!     available_quantity: 10,
//!     mrp: Some(Money::from_major(100)),
//!     selling_price: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_line(&product, &lot, false).unwrap();
//! cart.set_quantity(0, 2).unwrap();
//!
//! let totals = cart_totals(cart.lines());
//! assert_eq!(totals.subtotal, Money::from_major(200));
//! assert_eq!(totals.total_tax, Money::from_major(24));
//! assert_eq!(totals.grand_total, Money::from_major(224));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::money::Money;
use crate::types::{Lot, PaymentMethod, Product, TaxRate};

// =============================================================================
// Resolution rules
// =============================================================================

/// The price a batch is billed at.
///
/// Precedence: selling price, then MRP, then zero.
#[inline]
pub fn resolve_unit_price(lot: &Lot) -> Money {
    lot.selling_price.or(lot.mrp).unwrap_or(Money::ZERO)
}

/// The GST rate copied onto a new cart line.
///
/// Precedence: the product's own rate, then `fallback`.
#[inline]
pub fn resolve_tax_rate(product: &Product, fallback: TaxRate) -> TaxRate {
    product.tax_rate.unwrap_or(fallback)
}

// =============================================================================
// Line calculations
// =============================================================================

/// Unit price of a cart line.
#[inline]
pub fn line_unit_price(line: &CartLine) -> Money {
    resolve_unit_price(&line.lot)
}

/// Unit price × quantity.
pub fn line_subtotal(line: &CartLine) -> Money {
    line_unit_price(line)
        .checked_mul_quantity(line.quantity)
        .unwrap_or(Money::ZERO)
}

/// Subtotal minus the line discount. Not clamped: a discount larger than the
/// subtotal yields a negative taxable amount.
pub fn line_taxable_amount(line: &CartLine) -> Money {
    line_subtotal(line)
        .checked_sub(line.discount)
        .unwrap_or(Money::ZERO)
}

/// GST on the taxable amount at the rate frozen on the line.
pub fn line_tax(line: &CartLine) -> Money {
    line.tax_rate
        .tax_on(line_taxable_amount(line))
        .unwrap_or(Money::ZERO)
}

// =============================================================================
// Cart totals
// =============================================================================

/// Bill summary for the cart as it stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Number of cart lines.
    pub line_count: usize,
    /// Units across all lines.
    pub total_quantity: i64,
    pub subtotal: Money,
    pub total_discount: Money,
    pub taxable_total: Money,
    pub total_tax: Money,
    pub grand_total: Money,
}

fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Money {
    amounts
        .into_iter()
        .try_fold(Money::ZERO, Money::checked_add)
        .unwrap_or(Money::ZERO)
}

/// Computes every aggregate for `lines`.
pub fn cart_totals(lines: &[CartLine]) -> CartTotals {
    let subtotal = checked_sum(lines.iter().map(line_subtotal));
    let total_discount = checked_sum(lines.iter().map(|line| line.discount));
    let taxable_total = subtotal.checked_sub(total_discount).unwrap_or(Money::ZERO);
    let total_tax = checked_sum(lines.iter().map(line_tax));
    let grand_total = taxable_total.checked_add(total_tax).unwrap_or(Money::ZERO);

    CartTotals {
        line_count: lines.len(),
        total_quantity: lines
            .iter()
            .fold(0_i64, |sum, line| sum.saturating_add(line.quantity)),
        subtotal,
        total_discount,
        taxable_total,
        total_tax,
        grand_total,
    }
}

// =============================================================================
// Tender calculations
// =============================================================================

/// What the customer is taken to have paid: the typed amount, or the grand
/// total when nothing was typed.
#[inline]
pub fn effective_tendered(tendered: Option<Money>, grand_total: Money) -> Money {
    tendered.unwrap_or(grand_total)
}

/// Grand total minus what was tendered. Positive means money is still owed.
pub fn outstanding(tendered: Option<Money>, grand_total: Money) -> Money {
    grand_total
        .checked_sub(effective_tendered(tendered, grand_total))
        .unwrap_or(Money::ZERO)
}

/// Change to hand back. Only cash produces change; a negative value is a
/// shortfall and is reported as-is.
///
/// ```rust
/// use rxpos_core::pricing::change_due;
/// use rxpos_core::{Money, PaymentMethod};
///
/// let change = change_due(PaymentMethod::Cash, Money::parse_input("150"), Money::from_major(100));
/// assert_eq!(change, Money::from_major(50));
/// assert_eq!(change_due(PaymentMethod::Upi, Some(Money::from_major(150)), Money::from_major(100)), Money::ZERO);
/// ```
pub fn change_due(method: PaymentMethod, tendered: Option<Money>, grand_total: Money) -> Money {
    if method != PaymentMethod::Cash {
        return Money::ZERO;
    }
    effective_tendered(tendered, grand_total)
        .checked_sub(grand_total)
        .unwrap_or(Money::ZERO)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn lot(selling: Option<Money>, mrp: Option<Money>) -> Lot {
        Lot {
            id: "b1".into(),
            batch_number: "B1".into(),
            expiry_date: None,
            available_quantity: 100,
            mrp,
            selling_price: selling,
        }
    }

    fn product(tax: Option<TaxRate>) -> Product {
        Product {
            id: "p1".into(),
            name: "Cetirizine 10".into(),
            tax_rate: tax,
            requires_prescription: false,
        }
    }

    fn line(unit: Option<Money>, quantity: i64, discount: Money, rate: i64) -> CartLine {
        CartLine {
            product: product(None),
            lot: lot(unit, None),
            quantity,
            discount,
            tax_rate: TaxRate::from_percent(Decimal::from(rate)),
        }
    }

    #[test]
    fn test_unit_price_precedence() {
        let selling = Some(Money::from_major(90));
        let mrp = Some(Money::from_major(100));
        assert_eq!(resolve_unit_price(&lot(selling, mrp)), Money::from_major(90));
        assert_eq!(resolve_unit_price(&lot(None, mrp)), Money::from_major(100));
        assert_eq!(resolve_unit_price(&lot(None, None)), Money::ZERO);
        // zero is a real price, not "missing"
        assert_eq!(resolve_unit_price(&lot(Some(Money::ZERO), mrp)), Money::ZERO);
    }

    #[test]
    fn test_tax_rate_precedence() {
        let five = TaxRate::from_percent(Decimal::from(5));
        assert_eq!(resolve_tax_rate(&product(Some(five)), TaxRate::standard()), five);
        assert_eq!(resolve_tax_rate(&product(None), TaxRate::standard()), TaxRate::standard());
    }

    #[test]
    fn test_single_line_reference_example() {
        let lines = vec![line(Some(Money::from_major(100)), 2, Money::ZERO, 12)];
        let totals = cart_totals(&lines);
        assert_eq!(totals.subtotal, Money::from_major(200));
        assert_eq!(totals.total_tax, Money::from_major(24));
        assert_eq!(totals.grand_total, Money::from_major(224));
        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.total_quantity, 2);
    }

    #[test]
    fn test_missing_prices_give_zero_subtotal() {
        let l = line(None, 3, Money::ZERO, 12);
        assert_eq!(line_subtotal(&l), Money::ZERO);
        assert_eq!(line_tax(&l), Money::ZERO);
    }

    #[test]
    fn test_discount_reduces_taxable_amount() {
        let l = line(Some(Money::from_major(100)), 2, Money::from_major(50), 12);
        assert_eq!(line_taxable_amount(&l), Money::from_major(150));
        assert_eq!(line_tax(&l), Money::from_major(18));

        let totals = cart_totals(std::slice::from_ref(&l));
        assert_eq!(totals.total_discount, Money::from_major(50));
        assert_eq!(totals.taxable_total, Money::from_major(150));
        assert_eq!(totals.grand_total, Money::from_major(168));
    }

    #[test]
    fn test_discount_above_subtotal_goes_negative() {
        let l = line(Some(Money::from_major(10)), 1, Money::from_major(30), 10);
        assert_eq!(line_taxable_amount(&l), Money::from_major(-20));
        assert_eq!(line_tax(&l), Money::from_major(-2));
        assert_eq!(cart_totals(&[l]).grand_total, Money::from_major(-22));
    }

    #[test]
    fn test_no_intermediate_rounding() {
        // 3 lines of 10.99 at 12%: 1.3188 each, 3.9564 total (not 3.96)
        let lines: Vec<_> = (0..3)
            .map(|_| line(Some(Money::from_minor(1099)), 1, Money::ZERO, 12))
            .collect();
        let totals = cart_totals(&lines);
        assert_eq!(totals.total_tax.amount(), Decimal::new(39564, 4));
        assert_eq!(totals.total_tax.to_string(), "3.96");
    }

    #[test]
    fn test_overflowing_line_is_defused() {
        let huge = line(Some(Money::new(Decimal::MAX)), 2, Money::ZERO, 12);
        let normal = line(Some(Money::from_major(10)), 1, Money::ZERO, 0);
        assert_eq!(line_subtotal(&huge), Money::ZERO);
        let totals = cart_totals(&[huge, normal]);
        assert_eq!(totals.subtotal, Money::from_major(10));
        assert_eq!(totals.grand_total, Money::from_major(10));
    }

    #[test]
    fn test_overflowing_sum_is_defused() {
        let big = line(Some(Money::new(Decimal::MAX)), 1, Money::ZERO, 0);
        let totals = cart_totals(&[big.clone(), big]);
        assert_eq!(totals.subtotal, Money::ZERO);
    }

    #[test]
    fn test_pricing_is_idempotent() {
        let lines = vec![
            line(Some(Money::from_minor(4575)), 3, Money::from_minor(125), 5),
            line(Some(Money::from_major(12)), 10, Money::ZERO, 18),
        ];
        assert_eq!(cart_totals(&lines), cart_totals(&lines));
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(cart_totals(&[]), CartTotals::default());
    }

    #[test]
    fn test_change_due() {
        let total = Money::from_major(100);
        assert_eq!(
            change_due(PaymentMethod::Cash, Some(Money::from_major(150)), total),
            Money::from_major(50)
        );
        assert_eq!(change_due(PaymentMethod::Cash, None, total), Money::ZERO);
        assert_eq!(
            change_due(PaymentMethod::Cash, Some(Money::from_major(80)), total),
            Money::from_major(-20)
        );
        assert_eq!(
            change_due(PaymentMethod::Card, Some(Money::from_major(150)), total),
            Money::ZERO
        );
    }

    #[test]
    fn test_outstanding() {
        let total = Money::from_major(100);
        assert_eq!(outstanding(None, total), Money::ZERO);
        assert_eq!(outstanding(Some(Money::from_major(40)), total), Money::from_major(60));
        assert_eq!(outstanding(Some(Money::from_major(140)), total), Money::from_major(-40));
    }
}
