//! # rxpos-core: Pure Counter Billing Logic
//!
//! Everything the pharmacy billing counter decides, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        rxpos Counter Billing                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/counter                                 │   │
//! │  │    session, search controllers, command loop, receipts          │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐  ┌────────────▼────────────────┐  │
//! │  │  ★ rxpos-core (THIS CRATE) ★    │◄─│  rxpos-client               │  │
//! │  │                                 │  │  REST calls to the backend  │  │
//! │  │  money   types   cart           │  └─────────────────────────────┘  │
//! │  │  pricing validation checkout    │                                    │
//! │  │  search                         │                                    │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO CLOCK • NO NETWORK │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Decimal money, rounded only for display
//! - [`types`] - Domain types (Product, Lot, Customer, PaymentState, Invoice)
//! - [`cart`] - The cart store and its invariants
//! - [`pricing`] - Line and cart totals, change and outstanding amounts
//! - [`validation`] - Checkout rules and field validators
//! - [`checkout`] - Page-level draft and the invoice request payload
//! - [`search`] - Debounced search state machine
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same cart in, same totals out
//! 2. **No I/O**: the network and the clock belong to the caller
//! 3. **Exact Money**: decimal arithmetic, rounding only when displayed
//! 4. **Explicit Errors**: every rejection is a typed error, never a panic
//!
//! ## Example Usage
//!
//! ```rust
//! use rxpos_core::{CheckoutDraft, Lot, Money, PaymentMethod, Product};
//!
//! let product = Product {
//!     id: "p1".into(),
//!     name: "Dolo 650".into(),
//!     tax_rate: None,
//!     requires_prescription: false,
//! };
//! let lot = Lot {
//!     id: "b1".into(),
//!     batch_number: "DL4410".into(),
//!     expiry_date: None,
//!     available_quantity: 30,
//!     mrp: Some(Money::from_minor(3050)),
//!     selling_price: None,
//! };
//!
//! let mut draft = CheckoutDraft::new();
//! draft.add_line(&product, &lot).unwrap();
//! draft.set_payment_method(PaymentMethod::Cash);
//! draft.payment_mut().set_tendered_input("50");
//!
//! // 30.50 + 12% GST = 34.16
//! assert_eq!(draft.totals().grand_total.to_string(), "34.16");
//! assert_eq!(draft.change_due().to_string(), "15.84");
//!
//! let request = draft.build_request("shop-1").unwrap();
//! assert_eq!(request.items.len(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod pricing;
pub mod search;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, QuantityChange};
pub use checkout::{CheckoutDraft, CheckoutItem, CheckoutRequest};
pub use error::{CartError, CheckoutError, CoreError, ValidationError};
pub use money::Money;
pub use pricing::CartTotals;
pub use search::{RequestToken, SearchPhase, SearchPolicy, SearchTracker};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest search query sent to the backend, in characters.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

/// Customer search result limit.
pub const CUSTOMER_SEARCH_LIMIT: usize = 5;
