//! Fixtures and an in-memory backend for command tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rxpos_client::{BillingApi, ClientError, ClientResult};
use rxpos_core::{CheckoutRequest, Customer, Invoice, Lot, Money, Product};

pub fn product(id: &str, name: &str) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        tax_rate: None,
        requires_prescription: false,
    }
}

pub fn rx_product(id: &str, name: &str) -> Product {
    Product {
        requires_prescription: true,
        ..product(id, name)
    }
}

pub fn lot(id: &str, quantity: i64, price: &str) -> Lot {
    Lot {
        id: id.into(),
        batch_number: id.to_uppercase(),
        expiry_date: None,
        available_quantity: quantity,
        mrp: Money::parse_input(price),
        selling_price: None,
    }
}

pub fn customer(id: &str, name: &str) -> Customer {
    Customer {
        id: id.into(),
        name: name.into(),
        phone: None,
    }
}

/// Scriptable backend.
///
/// Searches answer from the fixed lists after `latency`; invoice creation
/// fails with `invoice_error` when set.
#[derive(Default)]
pub struct FakeApi {
    pub medicines: Vec<Product>,
    pub batches: Vec<Lot>,
    pub customers: Vec<Customer>,
    pub latency: Duration,
    pub invoice_error: Option<String>,
    /// Created invoices come back without amounts.
    pub sparse_invoice: bool,
    pub submitted: Mutex<Vec<CheckoutRequest>>,
    pub search_calls: AtomicUsize,
}

impl FakeApi {
    pub fn submitted(&self) -> Vec<CheckoutRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn matching<T: Clone>(items: &[T], query: &str, name: impl Fn(&T) -> &str) -> Vec<T> {
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| name(item).to_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[async_trait]
impl BillingApi for FakeApi {
    async fn search_medicines(&self, query: &str, _limit: usize) -> ClientResult<Vec<Product>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Ok(matching(&self.medicines, query, |p| &p.name))
    }

    async fn fetch_batches(&self, medicine_id: &str) -> ClientResult<Vec<Lot>> {
        if self.medicines.iter().any(|p| p.id == medicine_id) {
            Ok(self.batches.clone())
        } else {
            Err(ClientError::NotFound(format!("medicine {}", medicine_id)))
        }
    }

    async fn search_customers(&self, query: &str, _limit: usize) -> ClientResult<Vec<Customer>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Ok(matching(&self.customers, query, |c| &c.name))
    }

    async fn create_invoice(&self, request: &CheckoutRequest) -> ClientResult<Invoice> {
        self.wait().await;
        if let Some(message) = &self.invoice_error {
            return Err(ClientError::Backend {
                status: 422,
                message: message.clone(),
            });
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let total: Money = request
            .items
            .iter()
            .map(|item| {
                let taxable = item.unit_price.checked_mul_quantity(item.quantity).unwrap_or(Money::ZERO)
                    - item.discount_amount;
                taxable + item.tax_rate.tax_on(taxable).unwrap_or(Money::ZERO)
            })
            .fold(Money::ZERO, |acc, m| acc + m);

        Ok(Invoice {
            id: format!("inv-{}", submitted.len()),
            invoice_number: Some(format!("INV-{:04}", submitted.len())),
            total_amount: Some(total).filter(|_| !self.sparse_invoice),
            paid_amount: Some(request.paid_amount).filter(|_| !self.sparse_invoice),
            balance_amount: Some((total - request.paid_amount).non_negative())
                .filter(|_| !self.sparse_invoice),
            created_at: None,
        })
    }
}
