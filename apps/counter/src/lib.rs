//! # rxpos Counter Library
//!
//! The pharmacy billing counter: one cashier, one bill at a time, against the
//! shop's REST backend.
//!
//! ## Module Organization
//! ```text
//! rxpos_counter/
//! ├── lib.rs          ◄─── You are here (startup & command loop)
//! ├── repl.rs         ◄─── Command parsing and execution
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── counter.toml + RXPOS_* environment
//! │   └── session.rs  ◄─── Bill draft + submission guard
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── cart.rs     ◄─── Cart manipulation
//! │   ├── catalog.rs  ◄─── Batch lookup
//! │   ├── checkout.rs ◄─── Payment form, invoice, receipt
//! │   └── search.rs   ◄─── Debounced search tasks
//! └── error.rs        ◄─── AppError for commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Counter Startup                                   │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber on stderr, RUST_LOG or "info"                  │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → counter.toml → RXPOS_* → validate                      │
//! │                                                                         │
//! │  3. Build Backend Client ─────────────────────────────────────────────► │
//! │     • base URL, bearer token, timeout                                   │
//! │                                                                         │
//! │  4. Command Loop ─────────────────────────────────────────────────────► │
//! │     • one line per command, errors printed, session carries on          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod repl;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rxpos_client::ApiClient;

use error::AppError;
use repl::{Command, Counter, Outcome};
use state::CounterConfig;

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "rxpos-counter", about = "Pharmacy counter billing", long_about = None)]
pub struct Cli {
    /// Config file (default: platform config dir, counter.toml)
    #[arg(short, long, env = "RXPOS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=rxpos_client=debug` - Backend calls only
/// - Default: INFO level
///
/// Logs go to stderr; stdout belongs to the cashier.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the counter until `quit` or end of input.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let config = CounterConfig::load(cli.config)?;

    if cli.print_config {
        let mut shown = config.clone();
        if shown.api.token.is_some() {
            shown.api.token = Some("********".to_string());
        }
        let text = toml::to_string_pretty(&shown).map_err(|e| AppError::internal(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    let api = ApiClient::new(&config.client_config()?)?;
    info!(
        shop_id = %config.shop.id,
        backend = %config.api.base_url,
        "Counter ready"
    );

    let counter = Counter::new(Arc::new(config), Arc::new(api));
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    command_loop(counter, stdin, stdout)
        .await
        .map_err(|e| AppError::internal(format!("Terminal I/O failed: {}", e)))
}

/// Reads commands from `input` and writes results to `output`.
///
/// Command errors are printed and the loop continues. Only I/O errors on
/// the terminal itself end it.
pub async fn command_loop<R, W>(mut counter: Counter, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(b"Type help for commands.\n").await?;
    let mut lines = input.lines();

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match Command::parse(&line) {
            Ok(Some(command)) => counter.execute(command).await,
            Ok(None) => continue,
            Err(e) => Err(e),
        };

        match result {
            Ok(Outcome::Print(text)) => {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            Ok(Outcome::Quit) => break,
            Err(e) => {
                warn!(code = ?e.code, message = %e.message, "Command failed");
                output.write_all(format!("error: {}\n", e.message).as_bytes()).await?;
            }
        }
    }

    if counter.session().with_draft(|d| !d.cart().is_empty()) {
        warn!(session = %counter.session().id(), "Exiting with an unfinished bill");
    }
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{lot, product, FakeApi};
    use chrono::NaiveDate;

    fn counter() -> Counter {
        let mut config = CounterConfig::default();
        config.shop.id = "shop-7".into();
        let api = FakeApi {
            medicines: vec![product("m1", "Dolo 650")],
            batches: vec![lot("b1", 10, "100")],
            ..Default::default()
        };
        Counter::new(Arc::new(config), Arc::new(api))
            .with_today(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_loop_keeps_going_after_errors() {
        let input: &[u8] = b"find dolo\nbatches 1\nqty 1 5\nadd 1\n\nbogus\nshow\nquit\nshow\n";
        let mut output = Vec::new();

        command_loop(counter(), input, &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("1. Dolo 650"));
        assert!(text.contains("error: No line 1 in the cart"));
        assert!(text.contains("error: Unknown command 'bogus', type help"));
        assert!(text.contains("TOTAL ₹112.00"));
        assert_eq!(text.matches("TOTAL").count(), 2);
    }

    #[tokio::test]
    async fn test_command_loop_ends_at_eof() {
        let input: &[u8] = b"help\n";
        let mut output = Vec::new();

        command_loop(counter(), input, &mut output).await.unwrap();
        assert!(String::from_utf8(output).unwrap().contains("checkout"));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["rxpos-counter", "--config", "/tmp/counter.toml", "--print-config"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/counter.toml")));
        assert!(cli.print_config);
    }
}
