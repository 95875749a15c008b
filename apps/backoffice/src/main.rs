//! # Dukaan Back Office Operator Binary
//!
//! Runs maintenance and reporting commands against the shop database and
//! prints the result as JSON on stdout. Logs go to stderr.
//!
//! ## Usage
//! ```bash
//! dukaan-backoffice repair
//! dukaan-backoffice report 2026-10-01 2026-10-31
//! dukaan-backoffice --config ./backoffice.toml invoices
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing
//! 2. Load config (file → `DUKAAN_*` env overrides → validate)
//! 3. Connect to the database, run migrations, restore draft sessions
//! 4. Run the command

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;

use dukaan_backoffice::commands::{archive, customer, draft, invoice, report};
use dukaan_backoffice::error::ApiError;
use dukaan_backoffice::state::BackofficeConfig;
use dukaan_backoffice::{init_tracing, Backoffice};
use dukaan_core::archive::InvoiceFilter;

const USAGE: &str = "\
Dukaan Back Office

Usage: dukaan-backoffice [OPTIONS] <COMMAND>

Commands:
  repair                   Finish stock deduction for partially committed invoices
  report <START> <END>     Sales reconciliation for START..=END (YYYY-MM-DD)
  invoices                 List committed invoices with totals
  drafts                   List open draft sessions
  customers                List registered customers, newest first

Options:
  -c, --config <PATH>      Config file (default: platform config directory)
  -h, --help               Show this help message";

enum Command {
    Repair,
    Report { start: NaiveDate, end: NaiveDate },
    Invoices,
    Drafts,
    Customers,
}

#[tokio::main]
async fn main() -> ExitCode {
    let (config_path, command) = match parse_args(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    init_tracing();

    match run(config_path, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = ?e.code, "{}", e.message);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<PathBuf>, command: Command) -> Result<(), ApiError> {
    let config = BackofficeConfig::load(config_path)?;
    let backoffice = Backoffice::start(config).await?;

    match command {
        Command::Repair => {
            let sweep = invoice::repair_pending(&backoffice.db, &backoffice.config).await?;
            print_json(&sweep)
        }
        Command::Report { start, end } => {
            let report = report::sales_report(&backoffice.db, start, end).await?;
            print_json(&report)
        }
        Command::Invoices => {
            let archive = archive::list_invoices(&backoffice.db, &InvoiceFilter::default()).await?;
            print_json(&archive)
        }
        Command::Drafts => print_json(&draft::list_drafts(&backoffice.drafts).await),
        Command::Customers => print_json(&customer::list_customers(&backoffice.db).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args<I>(args: I) -> Result<Option<(Option<PathBuf>, Command)>, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
            _ => positional.push(arg),
        }
    }

    let command = match positional.as_slice() {
        [cmd] if cmd == "repair" => Command::Repair,
        [cmd] if cmd == "invoices" => Command::Invoices,
        [cmd] if cmd == "drafts" => Command::Drafts,
        [cmd] if cmd == "customers" => Command::Customers,
        [cmd, start, end] if cmd == "report" => Command::Report {
            start: parse_date(start)?,
            end: parse_date(end)?,
        },
        [cmd, ..] if cmd == "report" => return Err("report needs <START> <END>".to_string()),
        [] => return Err("no command given".to_string()),
        [cmd, ..] => return Err(format!("unknown command {}", cmd)),
    };

    Ok(Some((config_path, command)))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date {} (expected YYYY-MM-DD)", value))
}
