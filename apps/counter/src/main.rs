//! # rxpos Counter Entry Point
//!
//! Parses flags, starts logging and the Tokio runtime, then hands over to
//! [`rxpos_counter::run`]. The setup lives in lib.rs for testability.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use rxpos_counter::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = ?e.code, "{}", e.message);
            eprintln!("rxpos-counter: {}", e.message);
            ExitCode::FAILURE
        }
    }
}
