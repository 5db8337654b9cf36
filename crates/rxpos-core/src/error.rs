//! # Error Types
//!
//! Domain-specific error types for the counter billing core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  CoreError (umbrella)                                                   │
//! │  ├── Cart(CartError)            input rejection, cart unchanged         │
//! │  │   ├── PrescriptionRequired                                          │
//! │  │   ├── InsufficientStock                                             │
//! │  │   └── LineNotFound                                                  │
//! │  ├── Checkout(CheckoutError)    payment rule failed, nothing submitted  │
//! │  │   ├── EmptyCart                                                     │
//! │  │   ├── PrescriptionCustomerRequired                                  │
//! │  │   ├── PartialPaymentCustomerRequired                                │
//! │  │   ├── CreditCustomerRequired / CreditDueDateRequired                │
//! │  │   ├── ReferenceRequired { label }                                   │
//! │  │   └── ChequeDetailsRequired                                         │
//! │  └── Validation(ValidationError)  field-level input checks              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Handling Philosophy
//! Every error here is recoverable. The caller shows the message and the
//! cashier fixes the input; the cart and payment form stay as they were.

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Rejected cart mutation.
///
/// ## User Workflow
/// ```text
/// Add Azithral (Rx) without a customer
///      │
///      ▼
/// PrescriptionRequired { product: "Azithral 500" }
///      │
///      ▼
/// UI shows a warning, cart unchanged, cashier selects a customer
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Prescription medicine added before a customer was selected.
    #[error("{product} requires a prescription: select a customer first")]
    PrescriptionRequired { product: String },

    /// Requested quantity is more than the batch holds.
    #[error("Only {available} of {product} (batch {batch}) in stock, {requested} requested")]
    InsufficientStock {
        product: String,
        batch: String,
        available: i64,
        requested: i64,
    },

    /// No cart line at this position.
    #[error("No cart line at position {index}")]
    LineNotFound { index: usize },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// A payment rule that blocks checkout submission.
///
/// Rules are evaluated in a fixed order and only the first failure is
/// reported, see [`crate::validation::validate_checkout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Prescription medicines in the cart: select a customer before checkout")]
    PrescriptionCustomerRequired,

    #[error("Customer required for partial payment")]
    PartialPaymentCustomerRequired,

    #[error("Customer required for credit sales")]
    CreditCustomerRequired,

    #[error("Due date is required for credit sales")]
    CreditDueDateRequired,

    /// Card / UPI / net banking without its reference number.
    #[error("{label} is required")]
    ReferenceRequired { label: &'static str },

    #[error("Cheque number and cheque date are required")]
    ChequeDetailsRequired,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., not a number, not a date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Core Error
// =============================================================================

/// Umbrella error for callers that handle every core failure in one place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result of a cart mutation.
pub type CartResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_messages() {
        let err = CartError::InsufficientStock {
            product: "Dolo 650".to_string(),
            batch: "DL4410".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Only 3 of Dolo 650 (batch DL4410) in stock, 5 requested"
        );
    }

    #[test]
    fn test_checkout_error_messages() {
        let err = CheckoutError::ReferenceRequired {
            label: "UPI reference",
        };
        assert_eq!(err.to_string(), "UPI reference is required");
        assert_eq!(
            CheckoutError::PartialPaymentCustomerRequired.to_string(),
            "Customer required for partial payment"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "shop id".to_string(),
        };
        assert_eq!(err.to_string(), "shop id is required");
    }

    #[test]
    fn test_conversions_into_core_error() {
        let core: CoreError = CheckoutError::EmptyCart.into();
        assert!(matches!(core, CoreError::Checkout(CheckoutError::EmptyCart)));
        assert_eq!(core.to_string(), "Cart is empty");

        let core: CoreError = CartError::LineNotFound { index: 4 }.into();
        assert!(matches!(core, CoreError::Cart(_)));
    }
}
