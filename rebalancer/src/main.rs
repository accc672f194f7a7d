//! CLI entry point for the lotbook rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use lotbook_rebalancer::broker::connect_gateway;
use lotbook_rebalancer::config::{self, Config};
use lotbook_rebalancer::error::Error;
use lotbook_rebalancer::execution::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Target-list rebalancer for lot-based equities accounts")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Trade this account instead of `[account] id`
    #[arg(long)]
    account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the plan, confirm, and submit the orders
    Run {
        /// Path to the target list (CSV: symbol, target_lot, limit_price)
        target: PathBuf,

        /// Show plan without submitting
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Show the plan for a target list without submitting anything
    Plan {
        /// Path to the target list
        target: PathBuf,
    },

    /// Show current stock holdings
    Positions,

    /// Resolve symbols to their market segment
    Classify {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// List the accounts available to this login
    Accounts,
}

fn main() {
    // Before the logger, so RUST_LOG may come from .env. A missing file is normal.
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };
    if let Some(account) = cli.account {
        config.account.id = account;
    }

    let credentials = match config::credentials_from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading credentials: {e}");
            process::exit(1);
        }
    };

    let gateway = match connect_gateway(&config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            target,
            dry_run,
            force,
        } => {
            let opts = RunOptions {
                dry_run,
                force,
                target_file: target,
            };
            execution::run(&gateway, &config, &credentials, &opts).and_then(|report| {
                match report.audit_errors.len() {
                    0 => Ok(()),
                    n => Err(Error::AuditIncomplete(n)),
                }
            })
        }
        Command::Plan { target } => {
            let opts = RunOptions {
                dry_run: true,
                force: true,
                target_file: target,
            };
            execution::run(&gateway, &config, &credentials, &opts).map(|_| ())
        }
        Command::Positions => {
            execution::show_positions(&gateway, &config, &credentials).map(|_| ())
        }
        Command::Classify { symbols } => {
            execution::classify_symbols(&gateway, &config, &credentials, &symbols).map(|_| ())
        }
        Command::Accounts => execution::show_accounts(&gateway, &credentials),
    };

    if let Err(e) = result {
        match &e {
            Error::RiskFailed(msg) => {
                eprintln!("\nAborted: {msg}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
