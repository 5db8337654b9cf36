//! # Commands Module
//!
//! Everything the cashier can do, as plain functions over the session.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── cart.rs      ◄─── Add, quantity, discount, remove, clear
//! ├── catalog.rs   ◄─── Sellable batches for a medicine
//! ├── checkout.rs  ◄─── Payment form, invoice submission, receipt
//! └── search.rs    ◄─── Debounced medicine / customer search
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only needs the session
//! fn update_quantity(session: &SessionState, line_no: usize, quantity: i64)
//!
//! // Needs the backend
//! async fn sellable_batches(api: &dyn BillingApi, medicine_id: &str, today: NaiveDate)
//!
//! // Needs all three
//! async fn checkout(session: &SessionState, api: &dyn BillingApi, config: &CounterConfig)
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;
