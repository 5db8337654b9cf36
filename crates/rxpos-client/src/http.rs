//! # HTTP Client
//!
//! [`BillingApi`] over the backend's REST endpoints.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ApiClient::send                                                        │
//! │                                                                         │
//! │  endpoint(segments) ──► reqwest (timeout, bearer token) ──► status      │
//! │                                                                         │
//! │    2xx  ──► JSON ──► strip {"data": …} envelope ──► T                  │
//! │    401  ──► Unauthorized                                                │
//! │    404  ──► NotFound                                                    │
//! │    else ──► Backend { status, extract_error_message(body) }            │
//! │                                                                         │
//! │  Transport timeout ──► Timeout.  No retries: the cashier decides.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use rxpos_core::{CheckoutRequest, Customer, Invoice, Lot, Product};

use crate::api::BillingApi;
use crate::config::ClientConfig;
use crate::error::{extract_error_message_from_body, ClientError, ClientResult};

/// Header carrying the per-checkout correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CHECKOUT_FALLBACK: &str = "Failed to create invoice";

/// HTTP client for the pharmacy backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> ClientResult<T> {
        let response = self
            .authorize(request)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
                StatusCode::NOT_FOUND => ClientError::NotFound(
                    extract_error_message_from_body(&body, "resource not found"),
                ),
                _ => ClientError::Backend {
                    status: status.as_u16(),
                    message: extract_error_message_from_body(&body, fallback),
                },
            });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("body is not JSON: {}", e)))?;
        serde_json::from_value(unwrap_envelope(payload))
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Accepts both `{"data": payload}` and a bare payload.
fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl BillingApi for ApiClient {
    async fn search_medicines(&self, query: &str, limit: usize) -> ClientResult<Vec<Product>> {
        let url = self.endpoint(&["api", "medicines", "search"])?;
        let request = self
            .client
            .get(url)
            .query(&[("q", query.to_string()), ("limit", limit.to_string())]);

        let products: Vec<Product> = self.send(request, "Failed to search medicines").await?;
        debug!(query = %query, count = products.len(), "Medicine search");
        Ok(products)
    }

    async fn fetch_batches(&self, medicine_id: &str) -> ClientResult<Vec<Lot>> {
        let url = self.endpoint(&["api", "medicines", medicine_id, "batches"])?;
        let lots: Vec<Lot> = self
            .send(self.client.get(url), "Failed to load batches")
            .await?;
        debug!(medicine_id = %medicine_id, count = lots.len(), "Batches loaded");
        Ok(lots)
    }

    async fn search_customers(&self, query: &str, limit: usize) -> ClientResult<Vec<Customer>> {
        let url = self.endpoint(&["api", "customers", "search"])?;
        let request = self
            .client
            .get(url)
            .query(&[("q", query.to_string()), ("limit", limit.to_string())]);

        let customers: Vec<Customer> = self.send(request, "Failed to search customers").await?;
        debug!(query = %query, count = customers.len(), "Customer search");
        Ok(customers)
    }

    async fn create_invoice(&self, request: &CheckoutRequest) -> ClientResult<Invoice> {
        let url = self.endpoint(&["api", "invoices"])?;
        let request_id = Uuid::new_v4();

        info!(
            request_id = %request_id,
            shop_id = %request.shop_id,
            items = request.items.len(),
            method = %request.payment_method,
            paid = %request.paid_amount,
            "Submitting invoice"
        );

        let builder = self
            .client
            .post(url)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(request);

        match self.send::<Invoice>(builder, CHECKOUT_FALLBACK).await {
            Ok(invoice) => {
                info!(
                    request_id = %request_id,
                    invoice_id = %invoice.id,
                    total = ?invoice.total_amount,
                    "Invoice created"
                );
                Ok(invoice)
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Invoice creation failed");
                Err(e)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
