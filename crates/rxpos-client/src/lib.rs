//! # rxpos-client: Backend Client for the Billing Counter
//!
//! Async REST client for the pharmacy backend.
//!
//! ## Modules
//!
//! - [`api`] - The [`BillingApi`] trait the counter is written against
//! - [`http`] - [`ApiClient`], the reqwest implementation
//! - [`config`] - Base URL, bearer token, timeout
//! - [`error`] - [`ClientError`] and backend message extraction
//!
//! ## Example
//!
//! ```rust,no_run
//! use rxpos_client::{ApiClient, BillingApi, ClientConfig};
//!
//! # async fn demo() -> rxpos_client::ClientResult<()> {
//! let config = ClientConfig::new("https://api.medshop.in")?.with_token("secret");
//! let api = ApiClient::new(&config)?;
//!
//! let customers = api.search_customers("meera", 5).await?;
//! println!("{} matches", customers.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;

pub use api::BillingApi;
pub use config::ClientConfig;
pub use error::{extract_error_message, ClientError, ClientResult};
pub use http::ApiClient;
