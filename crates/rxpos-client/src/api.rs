//! The backend operations the billing counter depends on.

use async_trait::async_trait;
use std::sync::Arc;

use rxpos_core::{CheckoutRequest, Customer, Invoice, Lot, Product};

use crate::error::ClientResult;

/// Backend seam for the billing counter.
///
/// [`crate::ApiClient`] talks HTTP; tests plug in in-memory fakes.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Medicines whose name matches `query`.
    async fn search_medicines(&self, query: &str, limit: usize) -> ClientResult<Vec<Product>>;

    /// Every batch of a medicine, including empty and expired ones.
    async fn fetch_batches(&self, medicine_id: &str) -> ClientResult<Vec<Lot>>;

    /// Customers matching `query` by name or phone.
    async fn search_customers(&self, query: &str, limit: usize) -> ClientResult<Vec<Customer>>;

    /// Creates the invoice. Not idempotent: call once per checkout.
    async fn create_invoice(&self, request: &CheckoutRequest) -> ClientResult<Invoice>;
}

#[async_trait]
impl<T: BillingApi + ?Sized> BillingApi for Arc<T> {
    async fn search_medicines(&self, query: &str, limit: usize) -> ClientResult<Vec<Product>> {
        (**self).search_medicines(query, limit).await
    }

    async fn fetch_batches(&self, medicine_id: &str) -> ClientResult<Vec<Lot>> {
        (**self).fetch_batches(medicine_id).await
    }

    async fn search_customers(&self, query: &str, limit: usize) -> ClientResult<Vec<Customer>> {
        (**self).search_customers(query, limit).await
    }

    async fn create_invoice(&self, request: &CheckoutRequest) -> ClientResult<Invoice> {
        (**self).create_invoice(request).await
    }
}
