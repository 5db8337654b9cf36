//! # Checkout Commands
//!
//! Payment form input and invoice submission.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout Flow                                     │
//! │                                                                         │
//! │  1. Claim submission slot ────────► busy? "checkout already in progress"│
//! │                                                                         │
//! │  2. Validate + build request ─────► first failing rule, draft untouched │
//! │     (draft lock held, released before any network I/O)                 │
//! │                                                                         │
//! │  3. POST /api/invoices ───────────► error? draft untouched, retry ok   │
//! │                                                                         │
//! │  4. Reset draft, return receipt                                        │
//! │                                                                         │
//! │  5. Slot released (guard drop)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use rxpos_client::BillingApi;
use rxpos_core::{CartTotals, CheckoutDraft, CheckoutRequest, Invoice, Money, PaymentMethod};

use crate::commands::cart::{CartView, LineView};
use crate::error::AppError;
use crate::state::{CounterConfig, SessionState};

// =============================================================================
// Payment form
// =============================================================================

/// The payment panel as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub method: PaymentMethod,
    pub grand_total: Money,
    pub amount_tendered: Option<Money>,
    pub change_due: Money,
    pub outstanding: Money,
    pub reference: Option<String>,
    pub cheque_number: Option<String>,
    pub cheque_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// First checkout rule the bill currently fails, if any.
    pub blocking_issue: Option<String>,
}

impl From<&CheckoutDraft> for PaymentView {
    fn from(draft: &CheckoutDraft) -> Self {
        let payment = draft.payment();
        PaymentView {
            method: payment.method,
            grand_total: draft.totals().grand_total,
            amount_tendered: payment.amount_tendered,
            change_due: draft.change_due(),
            outstanding: draft.outstanding(),
            reference: payment.reference.clone(),
            cheque_number: payment.cheque_number.clone(),
            cheque_date: payment.cheque_date,
            due_date: payment.due_date,
            blocking_issue: draft.validate().err().map(|e| e.to_string()),
        }
    }
}

fn parse_date(field: &str, text: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("{} must be a date like 2026-06-30", field)))
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Gets the payment panel.
pub fn get_payment(session: &SessionState) -> PaymentView {
    session.with_draft(|draft| PaymentView::from(draft))
}

/// Switches the payment method ("cash", "upi", "card", ...).
pub fn set_payment_method(session: &SessionState, method: &str) -> Result<PaymentView, AppError> {
    let method: PaymentMethod = method.parse()?;
    debug!(%method, "set_payment_method command");

    Ok(session.with_draft_mut(|draft| {
        draft.set_payment_method(method);
        PaymentView::from(&*draft)
    }))
}

/// Takes the tendered amount as typed. Blank means "exact amount".
pub fn set_tendered(session: &SessionState, text: &str) -> PaymentView {
    session.with_draft_mut(|draft| {
        draft.payment_mut().set_tendered_input(text);
        PaymentView::from(&*draft)
    })
}

/// Card transaction ID, UPI or net banking reference.
pub fn set_reference(session: &SessionState, text: &str) -> PaymentView {
    session.with_draft_mut(|draft| {
        draft.payment_mut().reference = non_blank(text);
        PaymentView::from(&*draft)
    })
}

/// Cheque number and date (`YYYY-MM-DD`).
pub fn set_cheque(session: &SessionState, number: &str, date: &str) -> Result<PaymentView, AppError> {
    let date = parse_date("Cheque date", date)?;

    Ok(session.with_draft_mut(|draft| {
        let payment = draft.payment_mut();
        payment.cheque_number = non_blank(number);
        payment.cheque_date = Some(date);
        PaymentView::from(&*draft)
    }))
}

/// Due date for a credit sale (`YYYY-MM-DD`).
pub fn set_due_date(session: &SessionState, date: &str) -> Result<PaymentView, AppError> {
    let date = parse_date("Due date", date)?;

    Ok(session.with_draft_mut(|draft| {
        draft.payment_mut().due_date = Some(date);
        PaymentView::from(&*draft)
    }))
}

// =============================================================================
// Submission
// =============================================================================

/// Everything printed on the receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    pub invoice_id: String,
    pub invoice_number: Option<String>,
    pub created_at: Option<String>,
    pub customer: Option<String>,
    pub lines: Vec<LineView>,
    pub totals: CartTotals,
    pub payment_method: PaymentMethod,
    pub paid_amount: Money,
    pub change_due: Money,
    pub balance_amount: Money,
}

impl ReceiptView {
    /// Amounts the backend left out are filled from the submitted bill.
    fn new(bill: CartView, request: &CheckoutRequest, change_due: Money, invoice: Invoice) -> Self {
        let paid = invoice.paid_amount.unwrap_or(request.paid_amount);
        let balance = invoice
            .balance_amount
            .unwrap_or_else(|| (bill.totals.grand_total - paid).non_negative());
        ReceiptView {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            created_at: invoice.created_at,
            customer: bill.customer,
            lines: bill.lines,
            totals: bill.totals,
            payment_method: request.payment_method,
            paid_amount: paid,
            change_due,
            balance_amount: balance,
        }
    }

    /// Plain-text receipt for the terminal.
    pub fn render(&self, config: &CounterConfig) -> String {
        let money = |m: Money| config.format_money(m);
        let mut out = String::new();

        let _ = writeln!(out, "{}", config.shop.name);
        let _ = writeln!(
            out,
            "Invoice {}",
            self.invoice_number.as_deref().unwrap_or(&self.invoice_id)
        );
        if let Some(at) = &self.created_at {
            let _ = writeln!(out, "Date    {}", at);
        }
        if let Some(customer) = &self.customer {
            let _ = writeln!(out, "Customer {}", customer);
        }
        out.push_str(&"-".repeat(48));
        out.push('\n');

        for line in &self.lines {
            let _ = writeln!(
                out,
                "{:<28} {:>3} x {:>10}",
                line.name,
                line.quantity,
                money(line.unit_price)
            );
            if !line.discount.is_zero() {
                let _ = writeln!(out, "  discount {:>37}", format!("-{}", money(line.discount)));
            }
            let _ = writeln!(out, "  GST {:<6} {:>35}", line.tax_rate.to_string(), money(line.total));
        }

        out.push_str(&"-".repeat(48));
        out.push('\n');
        let _ = writeln!(out, "{:<20}{:>28}", "Subtotal", money(self.totals.subtotal));
        if !self.totals.total_discount.is_zero() {
            let _ = writeln!(out, "{:<20}{:>28}", "Discount", money(-self.totals.total_discount));
        }
        let _ = writeln!(out, "{:<20}{:>28}", "GST", money(self.totals.total_tax));
        let _ = writeln!(out, "{:<20}{:>28}", "TOTAL", money(self.totals.grand_total));
        let _ = writeln!(
            out,
            "{:<20}{:>28}",
            format!("Paid ({})", self.payment_method),
            money(self.paid_amount)
        );
        if self.change_due.is_positive() {
            let _ = writeln!(out, "{:<20}{:>28}", "Change", money(self.change_due));
        }
        if self.balance_amount.is_positive() {
            let _ = writeln!(out, "{:<20}{:>28}", "Balance due", money(self.balance_amount));
        }
        out
    }
}

/// Submits the bill as an invoice.
///
/// ## Behavior
/// - Only one submission at a time; a second call is rejected immediately
/// - Validation failures and backend errors leave the draft as it was
/// - On success the draft starts over: empty cart, cash, no customer
pub async fn checkout(
    session: &SessionState,
    api: &dyn BillingApi,
    config: &CounterConfig,
) -> Result<ReceiptView, AppError> {
    let _guard = session
        .try_begin_submit()
        .ok_or_else(AppError::checkout_in_progress)?;

    let (request, bill, change_due) = session.with_draft(|draft| {
        draft
            .build_request(&config.shop.id)
            .map(|request| (request, CartView::from(draft), draft.change_due()))
    })?;

    info!(
        session = %session.id(),
        items = request.items.len(),
        method = %request.payment_method,
        paid = %request.paid_amount,
        "Submitting checkout"
    );

    let invoice = api.create_invoice(&request).await.map_err(|e| {
        warn!(session = %session.id(), error = %e, "Checkout failed, bill kept");
        AppError::from(e)
    })?;

    session.with_draft_mut(|draft| draft.reset());
    info!(
        session = %session.id(),
        invoice_id = %invoice.id,
        balance = ?invoice.balance_amount,
        "Invoice created"
    );

    Ok(ReceiptView::new(bill, &request, change_due, invoice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_to_cart;
    use crate::commands::test_support::{customer, lot, product, FakeApi};
    use crate::error::ErrorCode;
    use rxpos_core::TaxRate;
    use std::time::Duration;

    fn config() -> CounterConfig {
        let mut config = CounterConfig::default();
        config.shop.id = "shop-7".into();
        config.shop.name = "Sri Sai Medicals".into();
        config
    }

    fn session_with_line() -> SessionState {
        let session = SessionState::new(TaxRate::standard());
        add_to_cart(&session, &product("m1", "Dolo 650"), &lot("b1", 10, "100")).unwrap();
        session
    }

    #[test]
    fn test_payment_panel() {
        let session = session_with_line();

        let view = set_tendered(&session, "300");
        assert_eq!(view.grand_total, Money::from_major(112));
        assert_eq!(view.change_due, Money::from_major(188));
        assert!(view.blocking_issue.is_none());

        let view = set_payment_method(&session, "upi").unwrap();
        assert_eq!(view.change_due, Money::ZERO);
        assert_eq!(view.amount_tendered, Some(Money::from_major(300)));
        assert_eq!(view.blocking_issue.as_deref(), Some("UPI reference is required"));

        let view = set_reference(&session, "  UPI-991  ");
        assert_eq!(view.reference.as_deref(), Some("UPI-991"));
        assert!(view.blocking_issue.is_none());
    }

    #[test]
    fn test_bad_input_is_rejected() {
        let session = session_with_line();
        assert_eq!(
            set_payment_method(&session, "bitcoin").unwrap_err().code,
            ErrorCode::ValidationError
        );
        assert_eq!(
            set_due_date(&session, "30/06/2026").unwrap_err().code,
            ErrorCode::ValidationError
        );
        assert_eq!(get_payment(&session).method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_successful_checkout_resets_bill() {
        let session = session_with_line();
        set_tendered(&session, "200");
        let api = FakeApi::default();

        let receipt = checkout(&session, &api, &config()).await.unwrap();
        assert_eq!(receipt.invoice_number.as_deref(), Some("INV-0001"));
        assert_eq!(receipt.totals.grand_total, Money::from_major(112));
        assert_eq!(receipt.paid_amount, Money::from_major(112));
        assert_eq!(receipt.change_due, Money::from_major(88));

        let sent = api.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].shop_id, "shop-7");
        assert_eq!(sent[0].items[0].batch_id, "b1");

        assert!(session.with_draft(|d| d.cart().is_empty()));
        assert!(!session.is_submitting());

        let text = receipt.render(&config());
        assert!(text.contains("Sri Sai Medicals"));
        assert!(text.contains("INV-0001"));
        assert!(text.contains("₹112.00"));
        assert!(text.contains("₹88.00"));
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_bill() {
        let session = session_with_line();
        set_payment_method(&session, "credit").unwrap();
        let api = FakeApi::default();

        let err = checkout(&session, &api, &config()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(err.message, "Customer required for credit sales");
        assert!(api.submitted().is_empty());
        assert_eq!(session.with_draft(|d| d.cart().len()), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_bill() {
        let session = session_with_line();
        let api = FakeApi {
            invoice_error: Some("Batch B1 has only 0 left".into()),
            ..Default::default()
        };

        let err = checkout(&session, &api, &config()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BackendError);
        assert_eq!(err.message, "Batch B1 has only 0 left");
        assert_eq!(session.with_draft(|d| d.cart().len()), 1);
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn test_credit_sale_with_balance() {
        let session = session_with_line();
        session.with_draft_mut(|d| d.select_customer(customer("c1", "Meera")));
        set_payment_method(&session, "credit").unwrap();
        set_tendered(&session, "12");
        set_due_date(&session, "2026-11-30").unwrap();
        let api = FakeApi::default();

        let receipt = checkout(&session, &api, &config()).await.unwrap();
        assert_eq!(receipt.balance_amount, Money::from_major(100));
        assert_eq!(receipt.customer.as_deref(), Some("Meera"));

        let sent = &api.submitted()[0];
        assert_eq!(sent.customer_id.as_deref(), Some("c1"));
        assert_eq!(sent.due_date, NaiveDate::from_ymd_opt(2026, 11, 30));
        assert!(receipt.render(&config()).contains("Balance due"));
    }

    #[tokio::test]
    async fn test_invoice_without_amounts_still_completes() {
        let session = session_with_line();
        session.with_draft_mut(|d| d.select_customer(customer("c1", "Meera")));
        set_payment_method(&session, "credit").unwrap();
        set_tendered(&session, "12");
        set_due_date(&session, "2026-11-30").unwrap();
        let api = FakeApi {
            sparse_invoice: true,
            ..Default::default()
        };

        let receipt = checkout(&session, &api, &config()).await.unwrap();
        assert_eq!(receipt.paid_amount, Money::from_major(12));
        assert_eq!(receipt.balance_amount, Money::from_major(100));
        assert!(session.with_draft(|d| d.cart().is_empty()));
        assert_eq!(api.submitted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checkout_is_rejected() {
        let session = session_with_line();
        let api = FakeApi {
            latency: Duration::from_secs(1),
            ..Default::default()
        };
        let config = config();

        let (first, second) = tokio::join!(
            checkout(&session, &api, &config),
            checkout(&session, &api, &config)
        );

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), AppError::checkout_in_progress());
        assert_eq!(api.submitted().len(), 1);
    }
}
