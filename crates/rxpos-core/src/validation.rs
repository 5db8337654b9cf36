//! # Validation Module
//!
//! The checkout gate plus field validators.
//!
//! ## Checkout Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_checkout(lines, payment, has_customer)                        │
//! │                                                                         │
//! │  1. cart empty? ─────────────────────────────► EmptyCart               │
//! │  2. Rx line and no customer? ───────────────► PrescriptionCustomer...  │
//! │  3. owed > 1, no customer, not cash/credit? ► PartialPaymentCustomer.. │
//! │  4. credit ─┬─ no customer? ────────────────► CreditCustomerRequired   │
//! │             ├─ no due date? ────────────────► CreditDueDateRequired    │
//! │             └─ otherwise ───────────────────► Ok (skips 5-7)           │
//! │  5. upi / net banking without reference ────► ReferenceRequired        │
//! │  6. card without transaction ID ────────────► ReferenceRequired        │
//! │  7. cheque without number + date ───────────► ChequeDetailsRequired    │
//! │  8. Ok                                                                  │
//! │                                                                         │
//! │  First failing rule wins. Cash and credit are exempt from rule 3:      │
//! │  small cash shortfalls are rounding, credit is partial by nature.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rxpos_core::validation::validate_checkout;
//! use rxpos_core::{CheckoutError, PaymentMethod, PaymentState};
//!
//! let payment = PaymentState::with_method(PaymentMethod::Upi);
//! assert_eq!(validate_checkout(&[], &payment, false), Err(CheckoutError::EmptyCart));
//! ```

use rust_decimal::Decimal;

use crate::cart::CartLine;
use crate::error::{CheckoutError, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{PaymentMethod, PaymentState, TaxRate};
use crate::MAX_SEARCH_QUERY_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortfall (in currency units) tolerated before a customer is required.
pub const PARTIAL_PAYMENT_TOLERANCE: i64 = 1;

// =============================================================================
// Checkout Gate
// =============================================================================

/// Decides whether the bill may be submitted.
///
/// Pure and synchronous; called once right before submission.
pub fn validate_checkout(
    lines: &[CartLine],
    payment: &PaymentState,
    has_customer: bool,
) -> Result<(), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    if !has_customer && lines.iter().any(|l| l.product.requires_prescription) {
        return Err(CheckoutError::PrescriptionCustomerRequired);
    }

    let grand_total = pricing::cart_totals(lines).grand_total;
    let owed = pricing::outstanding(payment.amount_tendered, grand_total);
    let exempt = matches!(payment.method, PaymentMethod::Cash | PaymentMethod::Credit);
    if owed > Money::from_major(PARTIAL_PAYMENT_TOLERANCE) && !has_customer && !exempt {
        return Err(CheckoutError::PartialPaymentCustomerRequired);
    }

    match payment.method {
        PaymentMethod::Credit => {
            if !has_customer {
                return Err(CheckoutError::CreditCustomerRequired);
            }
            if payment.due_date.is_none() {
                return Err(CheckoutError::CreditDueDateRequired);
            }
            Ok(())
        }
        PaymentMethod::Upi | PaymentMethod::NetBanking | PaymentMethod::Card => {
            match payment.method.reference_label() {
                Some(label) if !payment.has_reference() => {
                    Err(CheckoutError::ReferenceRequired { label })
                }
                _ => Ok(()),
            }
        }
        PaymentMethod::Cheque => {
            if payment.has_cheque_details() {
                Ok(())
            } else {
                Err(CheckoutError::ChequeDetailsRequired)
            }
        }
        PaymentMethod::Cash => Ok(()),
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Normalizes typed search text: trimmed, then cut to 100 characters.
///
/// Can come back empty; the caller decides what an empty search means.
pub fn normalize_search_query(text: &str) -> String {
    text.trim().chars().take(MAX_SEARCH_QUERY_LEN).collect()
}

/// Validates a GST rate.
///
/// ## Rules
/// - Between 0 % and 100 % inclusive
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.percent() < Decimal::ZERO || rate.percent() > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a required free-text field such as a shop id.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lot, Product};
    use chrono::NaiveDate;

    fn line(price: i64, rx: bool) -> CartLine {
        CartLine {
            product: Product {
                id: "p1".into(),
                name: "Montair LC".into(),
                tax_rate: None,
                requires_prescription: rx,
            },
            lot: Lot {
                id: "b1".into(),
                batch_number: "MT01".into(),
                expiry_date: None,
                available_quantity: 10,
                mrp: Some(Money::from_major(price)),
                selling_price: None,
            },
            quantity: 1,
            discount: Money::ZERO,
            tax_rate: TaxRate::zero(),
        }
    }

    fn due() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 11, 30)
    }

    #[test]
    fn test_empty_cart() {
        let payment = PaymentState::default();
        assert_eq!(validate_checkout(&[], &payment, true), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_plain_cash_sale_is_valid() {
        let payment = PaymentState::default();
        assert_eq!(validate_checkout(&[line(100, false)], &payment, false), Ok(()));
    }

    #[test]
    fn test_prescription_needs_customer() {
        let payment = PaymentState::default();
        let lines = [line(100, true)];
        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::PrescriptionCustomerRequired)
        );
        assert_eq!(validate_checkout(&lines, &payment, true), Ok(()));
    }

    #[test]
    fn test_upi_without_reference() {
        let payment = PaymentState::with_method(PaymentMethod::Upi);
        assert_eq!(
            validate_checkout(&[line(100, false)], &payment, false),
            Err(CheckoutError::ReferenceRequired { label: "UPI reference" })
        );
    }

    #[test]
    fn test_net_banking_and_card_labels() {
        let lines = [line(100, false)];
        let err = validate_checkout(&lines, &PaymentState::with_method(PaymentMethod::NetBanking), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "Net banking reference is required");

        let err = validate_checkout(&lines, &PaymentState::with_method(PaymentMethod::Card), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "Card transaction ID is required");

        let mut card = PaymentState::with_method(PaymentMethod::Card);
        card.reference = Some("TXN8812".into());
        assert_eq!(validate_checkout(&lines, &card, false), Ok(()));
    }

    #[test]
    fn test_credit_bypasses_reference_checks() {
        let mut payment = PaymentState::with_method(PaymentMethod::Credit);
        payment.due_date = due();
        payment.amount_tendered = Some(Money::ZERO);
        assert_eq!(validate_checkout(&[line(100, false)], &payment, true), Ok(()));
    }

    #[test]
    fn test_credit_needs_customer_then_due_date() {
        let lines = [line(100, false)];
        let mut payment = PaymentState::with_method(PaymentMethod::Credit);
        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::CreditCustomerRequired)
        );
        assert_eq!(
            validate_checkout(&lines, &payment, true),
            Err(CheckoutError::CreditDueDateRequired)
        );
        payment.due_date = due();
        assert_eq!(validate_checkout(&lines, &payment, true), Ok(()));
    }

    #[test]
    fn test_partial_payment_needs_customer() {
        let lines = [line(100, false)];
        let mut payment = PaymentState::with_method(PaymentMethod::Upi);
        payment.reference = Some("UPI123".into());
        payment.amount_tendered = Some(Money::from_major(60));

        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::PartialPaymentCustomerRequired)
        );
        assert_eq!(validate_checkout(&lines, &payment, true), Ok(()));
    }

    #[test]
    fn test_partial_payment_rule_comes_before_reference_rule() {
        let lines = [line(100, false)];
        let mut payment = PaymentState::with_method(PaymentMethod::Upi);
        payment.amount_tendered = Some(Money::from_major(10));
        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::PartialPaymentCustomerRequired)
        );
    }

    #[test]
    fn test_shortfall_within_tolerance() {
        let lines = [line(100, false)];
        let mut payment = PaymentState::with_method(PaymentMethod::Card);
        payment.reference = Some("TXN1".into());
        payment.amount_tendered = Some(Money::from_major(99));
        assert_eq!(validate_checkout(&lines, &payment, false), Ok(()));

        payment.amount_tendered = Some(Money::from_minor(9899));
        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::PartialPaymentCustomerRequired)
        );
    }

    #[test]
    fn test_cash_shortfall_is_exempt() {
        let mut payment = PaymentState::default();
        payment.amount_tendered = Some(Money::from_major(20));
        assert_eq!(validate_checkout(&[line(100, false)], &payment, false), Ok(()));
    }

    #[test]
    fn test_cheque_needs_number_and_date() {
        let lines = [line(100, false)];
        let mut payment = PaymentState::with_method(PaymentMethod::Cheque);
        payment.cheque_number = Some("000451".into());
        assert_eq!(
            validate_checkout(&lines, &payment, false),
            Err(CheckoutError::ChequeDetailsRequired)
        );
        payment.cheque_date = due();
        assert_eq!(validate_checkout(&lines, &payment, false), Ok(()));
    }

    #[test]
    fn test_normalize_search_query() {
        assert_eq!(normalize_search_query("  dolo "), "dolo");
        assert_eq!(normalize_search_query("   "), "");
        assert_eq!(normalize_search_query(&"a".repeat(101)).len(), MAX_SEARCH_QUERY_LEN);
        assert_eq!(normalize_search_query(&"é".repeat(120)).chars().count(), MAX_SEARCH_QUERY_LEN);
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(TaxRate::zero()).is_ok());
        assert!(validate_tax_rate(TaxRate::standard()).is_ok());
        assert!(validate_tax_rate(TaxRate::from_percent(Decimal::ONE_HUNDRED)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_percent(Decimal::from(101))).is_err());
        assert!(validate_tax_rate(TaxRate::from_percent(Decimal::from(-1))).is_err());
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("shop id", "shop-7").is_ok());
        assert!(validate_required("shop id", "  ").is_err());
    }
}
