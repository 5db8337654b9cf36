//! # Command Loop
//!
//! Parses cashier input and runs it against the session.
//!
//! ## Commands
//! ```text
//! find <text>          search medicines
//! batches <n>          sellable batches of result n
//! add <n>              add one unit from batch n
//! qty <line> <n>       set quantity (0 removes)
//! disc <line> <amt>    set line discount
//! rm <line>            remove line
//! cust <text>          search customers
//! pick <n>             select customer n
//! nocust               deselect customer
//! pay <method>         cash | card | upi | net_banking | cheque | credit
//! tender <amt>         amount handed over (blank = exact)
//! ref <text>           card / UPI / net banking reference
//! cheque <no> <date>   cheque number and date (YYYY-MM-DD)
//! due <date>           credit due date (YYYY-MM-DD)
//! show                 cart and payment
//! checkout             create the invoice
//! cancel               abandon the bill
//! help | quit
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::debug;

use rxpos_client::BillingApi;
use rxpos_core::{Customer, Lot, Product, SearchPhase};

use crate::commands::cart::{self, CartView};
use crate::commands::checkout::{self, PaymentView};
use crate::commands::catalog;
use crate::commands::search::SearchController;
use crate::error::AppError;
use crate::state::{CounterConfig, SessionState};

pub const HELP: &str = "\
find <text>          search medicines
batches <n>          sellable batches of result n
add <n>              add one unit from batch n
qty <line> <n>       set quantity (0 removes)
disc <line> <amt>    set line discount
rm <line>            remove line
cust <text>          search customers
pick <n>             select customer n
nocust               deselect customer
pay <method>         cash | card | upi | net_banking | cheque | credit
tender [amt]         amount handed over (blank = exact)
ref <text>           card / UPI / net banking reference
cheque <no> <date>   cheque number and date (YYYY-MM-DD)
due <date>           credit due date (YYYY-MM-DD)
show                 cart and payment
checkout             create the invoice
cancel               abandon the bill
help | quit";

// =============================================================================
// Parsing
// =============================================================================

/// One line of cashier input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Find(String),
    Batches(usize),
    Add(usize),
    Qty(usize, i64),
    Disc(usize, String),
    Rm(usize),
    Cust(String),
    Pick(usize),
    NoCust,
    Pay(String),
    Tender(String),
    Ref(String),
    Cheque(String, String),
    Due(String),
    Show,
    Checkout,
    Cancel,
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(what: &str, text: Option<&str>) -> Result<T, AppError> {
    let text = text.ok_or_else(|| AppError::validation(format!("{} is required", what)))?;
    text.parse()
        .map_err(|_| AppError::validation(format!("{} must be a number, got '{}'", what, text)))
}

fn rest(what: &str, text: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::validation(format!("{} is required", what)));
    }
    Ok(text.to_string())
}

impl Command {
    /// Parses a line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, AppError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, tail) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = tail.split_whitespace();

        let command = match word.to_ascii_lowercase().as_str() {
            "find" | "f" => Command::Find(rest("search text", tail)?),
            "batches" | "b" => Command::Batches(number("result number", args.next())?),
            "add" | "a" => Command::Add(number("batch number", args.next())?),
            "qty" | "q" => Command::Qty(
                number("line number", args.next())?,
                number("quantity", args.next())?,
            ),
            "disc" | "d" => Command::Disc(
                number("line number", args.next())?,
                rest("discount", args.next().unwrap_or(""))?,
            ),
            "rm" => Command::Rm(number("line number", args.next())?),
            "cust" | "c" => Command::Cust(rest("search text", tail)?),
            "pick" | "p" => Command::Pick(number("customer number", args.next())?),
            "nocust" => Command::NoCust,
            "pay" => Command::Pay(rest("payment method", tail)?),
            "tender" | "t" => Command::Tender(tail.trim().to_string()),
            "ref" => Command::Ref(tail.trim().to_string()),
            "cheque" => Command::Cheque(
                rest("cheque number", args.next().unwrap_or(""))?,
                rest("cheque date", args.next().unwrap_or(""))?,
            ),
            "due" => Command::Due(rest("due date", tail)?),
            "show" | "s" => Command::Show,
            "checkout" | "done" => Command::Checkout,
            "cancel" => Command::Cancel,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(AppError::validation(format!(
                    "Unknown command '{}', type help",
                    other
                )))
            }
        };
        Ok(Some(command))
    }
}

// =============================================================================
// Execution
// =============================================================================

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Quit,
}

/// The billing counter: one session plus its two search boxes.
pub struct Counter {
    config: Arc<CounterConfig>,
    api: Arc<dyn BillingApi>,
    session: Arc<SessionState>,
    medicines: SearchController<Product>,
    customers: SearchController<Customer>,
    /// Medicine whose batches were listed last, with those batches.
    picked: Option<(Product, Vec<Lot>)>,
    today: Option<NaiveDate>,
}

fn pick<T: Clone>(items: &[T], n: usize, what: &str) -> Result<T, AppError> {
    n.checked_sub(1)
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| AppError::validation(format!("No {} numbered {}", what, n)))
}

impl Counter {
    pub fn new(config: Arc<CounterConfig>, api: Arc<dyn BillingApi>) -> Self {
        let session = Arc::new(SessionState::new(config.shop.default_tax_rate));
        Counter {
            medicines: SearchController::medicines(api.clone(), config.medicine_policy()),
            customers: SearchController::customers(api.clone(), config.customer_policy()),
            config,
            api,
            session,
            picked: None,
            today: None,
        }
    }

    /// Pins the date used for expiry checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Runs one command.
    pub async fn execute(&mut self, command: Command) -> Result<Outcome, AppError> {
        debug!(session = %self.session.id(), ?command, "Executing command");

        let text = match command {
            Command::Find(text) => {
                let products = self.search_medicines(&text).await?;
                self.picked = None;
                render_list(&products, |p| {
                    if p.requires_prescription {
                        format!("{} [Rx]", p.name)
                    } else {
                        p.name.clone()
                    }
                })
            }
            Command::Batches(n) => {
                let product = pick(&self.medicines.results(), n, "medicine")?;
                let lots = catalog::sellable_batches(self.api.as_ref(), &product.id, self.today()).await?;
                let text = if lots.is_empty() {
                    format!("No sellable batches of {}", product.name)
                } else {
                    self.render_batches(&product, &lots)
                };
                self.picked = Some((product, lots));
                text
            }
            Command::Add(n) => {
                let (product, lots) = self
                    .picked
                    .as_ref()
                    .ok_or_else(|| AppError::validation("List batches first"))?;
                let lot = pick(lots, n, "batch")?;
                let view = cart::add_to_cart(&self.session, product, &lot)?;
                self.render_cart(&view)
            }
            Command::Qty(line, qty) => self.render_cart(&cart::update_quantity(&self.session, line, qty)?),
            Command::Disc(line, amount) => {
                self.render_cart(&cart::apply_discount(&self.session, line, &amount)?)
            }
            Command::Rm(line) => self.render_cart(&cart::remove_from_cart(&self.session, line)?),
            Command::Cust(text) => {
                let customers = self.search_customers(&text).await?;
                render_list(&customers, |c| match &c.phone {
                    Some(phone) => format!("{} ({})", c.name, phone),
                    None => c.name.clone(),
                })
            }
            Command::Pick(n) => {
                let customer = pick(&self.customers.results(), n, "customer")?;
                let name = customer.name.clone();
                self.session.with_draft_mut(|d| d.select_customer(customer));
                self.customers.clear();
                format!("Customer: {}", name)
            }
            Command::NoCust => match self.session.with_draft_mut(|d| d.clear_customer()) {
                Some(c) => format!("Removed customer {}", c.name),
                None => "No customer selected".to_string(),
            },
            Command::Pay(method) => self.render_payment(&checkout::set_payment_method(&self.session, &method)?),
            Command::Tender(amount) => self.render_payment(&checkout::set_tendered(&self.session, &amount)),
            Command::Ref(reference) => self.render_payment(&checkout::set_reference(&self.session, &reference)),
            Command::Cheque(number, date) => {
                self.render_payment(&checkout::set_cheque(&self.session, &number, &date)?)
            }
            Command::Due(date) => self.render_payment(&checkout::set_due_date(&self.session, &date)?),
            Command::Show => {
                let mut out = self.render_cart(&cart::get_cart(&self.session));
                out.push('\n');
                out.push_str(&self.render_payment(&checkout::get_payment(&self.session)));
                out
            }
            Command::Checkout => {
                let receipt = checkout::checkout(&self.session, self.api.as_ref(), &self.config).await?;
                self.picked = None;
                self.medicines.clear();
                receipt.render(&self.config)
            }
            Command::Cancel => {
                cart::clear_cart(&self.session);
                self.picked = None;
                "Bill cancelled".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };

        Ok(Outcome::Print(text))
    }

    async fn search_medicines(&self, text: &str) -> Result<Vec<Product>, AppError> {
        let handle = self.medicines.input(text).ok_or_else(|| self.too_short())?;
        handle.await.map_err(|e| AppError::internal(e.to_string()))?;
        searched(self.medicines.phase(), self.medicines.results())
    }

    async fn search_customers(&self, text: &str) -> Result<Vec<Customer>, AppError> {
        let handle = self.customers.input(text).ok_or_else(|| self.too_short())?;
        handle.await.map_err(|e| AppError::internal(e.to_string()))?;
        searched(self.customers.phase(), self.customers.results())
    }

    fn too_short(&self) -> AppError {
        AppError::validation(format!(
            "Type at least {} characters to search",
            self.config.search.min_chars
        ))
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn render_batches(&self, product: &Product, lots: &[Lot]) -> String {
        let mut out = format!("{}\n", product.name);
        for (i, lot) in lots.iter().enumerate() {
            let price = self.config.format_money(rxpos_core::pricing::resolve_unit_price(lot));
            let expiry = lot
                .expiry_date
                .map(|d| d.format("%m/%Y").to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:>3}. {:<12} exp {:<8} stock {:>4}  {:>10}",
                i + 1,
                lot.batch_number,
                expiry,
                lot.available_quantity,
                price
            );
        }
        out.trim_end().to_string()
    }

    fn render_cart(&self, view: &CartView) -> String {
        let money = |m| self.config.format_money(m);
        if view.lines.is_empty() {
            return "Cart is empty".to_string();
        }

        let mut out = String::new();
        if let Some(customer) = &view.customer {
            let _ = writeln!(out, "Customer: {}", customer);
        }
        for line in &view.lines {
            let _ = writeln!(
                out,
                "{:>3}. {:<24} {:<10} {:>3} x {:>10}  {:>11}",
                line.line_no,
                line.name,
                line.batch_number,
                line.quantity,
                money(line.unit_price),
                money(line.total)
            );
            if !line.discount.is_zero() {
                let _ = writeln!(out, "     discount {}", money(line.discount));
            }
        }
        let totals = &view.totals;
        let _ = writeln!(
            out,
            "Subtotal {}  Discount {}  GST {}",
            money(totals.subtotal),
            money(totals.total_discount),
            money(totals.total_tax)
        );
        let _ = write!(out, "TOTAL {}", money(totals.grand_total));
        out
    }

    fn render_payment(&self, view: &PaymentView) -> String {
        let money = |m| self.config.format_money(m);
        let mut out = format!("Payment: {}  Total {}", view.method, money(view.grand_total));
        if let Some(tendered) = view.amount_tendered {
            let _ = write!(out, "  Tendered {}", money(tendered));
        }
        if view.change_due.is_positive() {
            let _ = write!(out, "  Change {}", money(view.change_due));
        }
        if view.outstanding.is_positive() {
            let _ = write!(out, "  Outstanding {}", money(view.outstanding));
        }
        if let Some(issue) = &view.blocking_issue {
            let _ = write!(out, "\n! {}", issue);
        }
        out
    }
}

fn searched<T>(phase: SearchPhase, results: Vec<T>) -> Result<Vec<T>, AppError> {
    match phase {
        SearchPhase::Aborted => Err(AppError::new(
            crate::error::ErrorCode::Network,
            "Search did not complete, try again",
        )),
        _ => Ok(results),
    }
}

fn render_list<T>(items: &[T], describe: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return "No matches".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{:>3}. {}", i + 1, describe(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{customer, lot, product, rx_product, FakeApi};
    use crate::error::ErrorCode;
    use rxpos_core::{Money, PaymentMethod};

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(
            Command::parse("find  dolo 650 ").unwrap(),
            Some(Command::Find("dolo 650".into()))
        );
        assert_eq!(Command::parse("QTY 2 5").unwrap(), Some(Command::Qty(2, 5)));
        assert_eq!(Command::parse("qty 2 -1").unwrap(), Some(Command::Qty(2, -1)));
        assert_eq!(
            Command::parse("cheque 004512 2026-06-30").unwrap(),
            Some(Command::Cheque("004512".into(), "2026-06-30".into()))
        );
        assert_eq!(Command::parse("tender").unwrap(), Some(Command::Tender(String::new())));
        assert_eq!(Command::parse("quit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("qty two 5").is_err());
        assert!(Command::parse("rm").is_err());
        assert!(Command::parse("find").is_err());
        assert!(Command::parse("cheque 0045").is_err());
        let err = Command::parse("sell 3").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("sell"));
    }

    fn counter(api: FakeApi) -> (Counter, Arc<FakeApi>) {
        let mut config = CounterConfig::default();
        config.shop.id = "shop-7".into();
        let api = Arc::new(api);
        let counter = Counter::new(Arc::new(config), api.clone())
            .with_today(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        (counter, api)
    }

    async fn run(counter: &mut Counter, line: &str) -> Result<String, AppError> {
        let command = Command::parse(line)?.expect("command");
        match counter.execute(command).await? {
            Outcome::Print(text) => Ok(text),
            Outcome::Quit => Ok("<quit>".into()),
        }
    }

    fn backend() -> FakeApi {
        FakeApi {
            medicines: vec![product("m1", "Dolo 650"), rx_product("m2", "Azithral 500")],
            batches: vec![lot("b1", 10, "30.50")],
            customers: vec![customer("c1", "Meera Nair")],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cash_sale() {
        let (mut counter, api) = counter(backend());

        let found = run(&mut counter, "find dolo").await.unwrap();
        assert!(found.contains("1. Dolo 650"));

        let batches = run(&mut counter, "batches 1").await.unwrap();
        assert!(batches.contains("B1"));

        let cart = run(&mut counter, "add 1").await.unwrap();
        assert!(cart.contains("TOTAL ₹34.16"));

        let payment = run(&mut counter, "tender 50").await.unwrap();
        assert!(payment.contains("Change ₹15.84"));

        let receipt = run(&mut counter, "checkout").await.unwrap();
        assert!(receipt.contains("INV-0001"));
        assert_eq!(api.submitted()[0].paid_amount, Money::parse_input("34.16").unwrap());

        assert_eq!(run(&mut counter, "show").await.unwrap().lines().next(), Some("Cart is empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prescription_flow() {
        let (mut counter, api) = counter(backend());

        assert!(run(&mut counter, "find azi").await.unwrap().contains("[Rx]"));
        run(&mut counter, "batches 1").await.unwrap();

        let err = run(&mut counter, "add 1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PrescriptionRequired);

        assert!(run(&mut counter, "cust meera").await.unwrap().contains("Meera Nair"));
        assert_eq!(run(&mut counter, "pick 1").await.unwrap(), "Customer: Meera Nair");
        run(&mut counter, "add 1").await.unwrap();

        run(&mut counter, "pay upi").await.unwrap();
        let err = run(&mut counter, "checkout").await.unwrap_err();
        assert_eq!(err.message, "UPI reference is required");

        run(&mut counter, "ref UPI-42").await.unwrap();
        run(&mut counter, "checkout").await.unwrap();

        let sent = &api.submitted()[0];
        assert_eq!(sent.payment_method, PaymentMethod::Upi);
        assert_eq!(sent.customer_id.as_deref(), Some("c1"));
        assert_eq!(sent.payment_reference.as_deref(), Some("UPI-42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_checkout_keeps_cart() {
        let (mut counter, _api) = counter(FakeApi {
            invoice_error: Some("Server is busy".into()),
            ..backend()
        });

        run(&mut counter, "find dolo").await.unwrap();
        run(&mut counter, "batches 1").await.unwrap();
        run(&mut counter, "add 1").await.unwrap();

        let err = run(&mut counter, "checkout").await.unwrap_err();
        assert_eq!(err.message, "Server is busy");
        assert!(run(&mut counter, "show").await.unwrap().contains("Dolo 650"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_rails() {
        let (mut counter, _api) = counter(backend());

        assert_eq!(run(&mut counter, "add 1").await.unwrap_err().message, "List batches first");
        assert_eq!(run(&mut counter, "batches 1").await.unwrap_err().code, ErrorCode::ValidationError);
        assert!(run(&mut counter, "find d").await.unwrap_err().message.contains("at least 2"));
        assert_eq!(run(&mut counter, "find zzz").await.unwrap(), "No matches");
        assert_eq!(run(&mut counter, "nocust").await.unwrap(), "No customer selected");
        assert_eq!(run(&mut counter, "quit").await.unwrap(), "<quit>");
    }
}
