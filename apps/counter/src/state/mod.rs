//! # State Module
//!
//! Long-lived state shared by counter commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐    │
//! │  │      SessionState        │      │       CounterConfig          │    │
//! │  │                          │      │                              │    │
//! │  │  Mutex<CheckoutDraft>    │      │  shop id / name / tax rate   │    │
//! │  │  cart, customer, payment │      │  backend URL + token         │    │
//! │  │  submission flag         │      │  search tuning, currency     │    │
//! │  └──────────────────────────┘      └──────────────────────────────┘    │
//! │         read / write                     read-only after load          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod session;

pub use config::CounterConfig;
pub use session::{SessionState, SubmitGuard};
