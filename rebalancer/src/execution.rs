//! Execution orchestrator: load → classify → snapshot → plan → confirm → dispatch.
//!
//! This is the main workflow that ties together all components. Everything
//! irreversible happens last: no order is placed unless loading,
//! classification, the inventory snapshot and planning all succeeded.

use std::path::PathBuf;

use log::{error, info};
use lotbook::{MarketSegment, Symbol, shares_to_lots};
use lotbook_broker::{ActiveAccount, Broker, Credentials, MarketData, Session};

use crate::audit::{self, AuditLog};
use crate::classify::{Classify, LazyClassifier};
use crate::config::{Config, FetchFailurePolicy};
use crate::diff::{self, OrderIntent, Plan};
use crate::dispatch::{self, DispatchResult, DispatchSummary};
use crate::error::{Error, Result};
use crate::inventory::{self, InventoryMap};
use crate::target::{DroppedRow, TargetList};

/// Options for a rebalance run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub target_file: PathBuf,
}

/// The logged-in session and the account this run trades.
pub struct RunContext {
    pub session: Session,
    pub account: ActiveAccount,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub plan: Plan,
    pub dropped: Vec<DroppedRow>,
    pub results: Vec<DispatchResult>,
    pub summary: DispatchSummary,
    /// False for dry runs, empty plans and declined confirmations.
    pub executed: bool,
    /// Audit writes that failed after orders were dispatched.
    pub audit_errors: Vec<String>,
}

/// Log in and select the configured account.
pub fn connect_session<B: Broker + ?Sized>(
    broker: &B,
    credentials: &Credentials,
    account_id: &str,
) -> Result<RunContext> {
    let session = broker
        .login(credentials)
        .map_err(|e| Error::Connection(e.to_string()))?;
    info!(
        "logged in as {}, {} accounts available",
        credentials.id,
        session.accounts().len()
    );

    let account = session
        .select(account_id)
        .map_err(|_| Error::AccountNotFound(account_id.to_string()))?;
    info!("trading account {}", account.id());

    Ok(RunContext { session, account })
}

/// Refuse plans with more orders than the per-run cap.
pub fn enforce_max_orders_per_run(orders: &[OrderIntent], max: usize) -> Result<()> {
    if orders.len() > max {
        return Err(Error::RiskFailed(format!(
            "{} orders planned, max_orders_per_run is {max}",
            orders.len()
        )));
    }
    Ok(())
}

/// Execute a full rebalance run, auditing to the configured log directory.
pub fn run<G: Broker + MarketData>(
    gateway: &G,
    config: &Config,
    credentials: &Credentials,
    opts: &RunOptions,
) -> Result<RunReport> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    run_with_audit(gateway, config, credentials, opts, &mut audit)
}

/// Execute a full rebalance run against an already opened audit log.
///
/// Audit failures before dispatch abort the run. Once orders are out, every
/// result is still printed and returned; failed audit writes are collected in
/// [`RunReport::audit_errors`].
pub fn run_with_audit<G: Broker + MarketData>(
    gateway: &G,
    config: &Config,
    credentials: &Credentials,
    opts: &RunOptions,
    audit: &mut AuditLog,
) -> Result<RunReport> {
    audit::log_run_started(
        audit,
        &opts.target_file.display().to_string(),
        &config.account.id,
        opts.dry_run,
    )?;

    // 1. Parse the whole list before touching the broker
    let list = TargetList::load(&opts.target_file, config.target.has_header)?;
    info!(
        "{} target rows parsed from {}",
        list.rows.len(),
        opts.target_file.display()
    );

    // 2. Session
    let ctx = connect_session(gateway, credentials, &config.account.id)?;

    // 3. Classify (segment table fetched on first lookup)
    let classifier = LazyClassifier::new(gateway, &ctx.session);
    let loaded = list.into_intents(&classifier)?;
    audit::log_targets_loaded(audit, &loaded)?;

    // 4. Inventory snapshot
    let inventory = inventory::fetch_inventory(
        gateway,
        &ctx.account,
        config.inventory.on_fetch_failure,
        config.retry_delay(),
    )?;
    audit::log_inventory(audit, &inventory)?;

    // 5. Plan
    let plan = diff::plan(&loaded.intents, &inventory);
    audit::log_plan(audit, &plan)?;

    let mut report = RunReport {
        plan,
        dropped: loaded.dropped,
        ..RunReport::default()
    };

    display_dropped(&report.dropped);

    if report.plan.is_empty() {
        println!("\nNo rebalancing needed: holdings match targets.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(report);
    }

    display_plan(&report.plan, &inventory);

    // 6. Guards
    enforce_max_orders_per_run(&report.plan.orders, config.execution.max_orders_per_run)?;

    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(report);
    }

    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Submit {} orders to account {}?",
                report.plan.orders.len(),
                ctx.account.id()
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        audit.log("user_confirmed", serde_json::json!({"approved": confirmed}))?;
        if !confirmed {
            println!("Aborted.");
            return Ok(report);
        }
    }

    // 7. Dispatch
    report.results = dispatch::dispatch(
        gateway,
        &ctx.account,
        &report.plan.orders,
        config.execution.max_concurrency,
    )?;
    report.executed = true;

    for (i, r) in report.results.iter().enumerate() {
        if let Err(e) = audit::log_order_result(audit, r) {
            error!("audit write failed for {} {}: {e}", r.side, r.symbol);
            report.audit_errors.push(e.to_string());
        }
        println!(
            "[{}/{}] {} {} {} ... {}",
            i + 1,
            report.results.len(),
            r.side,
            r.quantity,
            r.symbol,
            r.outcome
        );
    }

    report.summary = DispatchSummary::from_results(&report.results);
    if let Err(e) = audit::log_run_completed(audit, &report.summary) {
        error!("audit write failed for run summary: {e}");
        report.audit_errors.push(e.to_string());
    }
    println!(
        "\n{}. Audit logged to {}",
        report.summary,
        config.audit_path().display()
    );

    let not_accepted: Vec<_> = report
        .results
        .iter()
        .filter(|r| !r.outcome.is_accepted())
        .map(|r| r.symbol.as_str())
        .collect();
    if !not_accepted.is_empty() {
        println!("Not accepted: {}", not_accepted.join(", "));
    }

    Ok(report)
}

/// Show current stock holdings for the configured account.
pub fn show_positions<B: Broker + ?Sized>(
    broker: &B,
    config: &Config,
    credentials: &Credentials,
) -> Result<InventoryMap> {
    let ctx = connect_session(broker, credentials, &config.account.id)?;
    // Never substitute an empty snapshot when just looking.
    let inventory = inventory::fetch_inventory(
        broker,
        &ctx.account,
        FetchFailurePolicy::FailClosed,
        config.retry_delay(),
    )?;

    println!("Account {}\n", ctx.account.id());
    display_inventory(&inventory);
    Ok(inventory)
}

/// List the accounts the login may trade.
pub fn show_accounts<B: Broker + ?Sized>(broker: &B, credentials: &Credentials) -> Result<()> {
    let session = broker
        .login(credentials)
        .map_err(|e| Error::Connection(e.to_string()))?;

    if session.accounts().is_empty() {
        println!("No accounts available.");
        return Ok(());
    }

    println!("  {:10} {:8} {:10} Name", "Account", "Branch", "Type");
    for a in session.accounts() {
        println!(
            "  {:10} {:8} {:10} {}",
            a.account, a.branch_no, a.account_type, a.name
        );
    }
    Ok(())
}

/// Resolve each symbol to its market segment and print the result.
pub fn classify_symbols<G: Broker + MarketData>(
    gateway: &G,
    config: &Config,
    credentials: &Credentials,
    symbols: &[String],
) -> Result<Vec<(String, Option<MarketSegment>)>> {
    let ctx = connect_session(gateway, credentials, &config.account.id)?;
    let classifier = LazyClassifier::new(gateway, &ctx.session);

    let mut out = Vec::with_capacity(symbols.len());
    for raw in symbols {
        let segment = match Symbol::try_new(raw) {
            Some(sym) => classifier.classify(&sym)?,
            None => None,
        };
        match segment {
            Some(seg) => println!("  {raw:8} {seg:4} ({})", seg.market_type()),
            None => println!("  {raw:8} unresolved"),
        }
        out.push((raw.clone(), segment));
    }
    Ok(out)
}

// === Display helpers ===

fn display_inventory(inventory: &InventoryMap) {
    if inventory.is_empty() {
        println!("No stock positions.");
        return;
    }

    println!("CURRENT HOLDINGS:");
    for (symbol, shares) in inventory.iter_sorted() {
        println!(
            "  {:8} {:>10} shares  ({:>8.3} lots)",
            symbol,
            shares,
            shares_to_lots(shares)
        );
    }
}

fn display_dropped(dropped: &[DroppedRow]) {
    if dropped.is_empty() {
        return;
    }
    println!("\nDROPPED ROWS:");
    for d in dropped {
        println!("  line {:>4}  {:8} {}", d.line, d.symbol, d.reason);
    }
}

fn display_plan(plan: &Plan, inventory: &InventoryMap) {
    if inventory.is_fallback() {
        println!("\nWARNING: inventory unavailable, planning against EMPTY holdings.");
    }

    println!("\nREBALANCE ORDERS:");
    println!(
        "  {:>3}  {:4} {:8} {:>8} {:>8} {:>10} {:>8} {:6}",
        "#", "Side", "Symbol", "Held", "Target", "Shares", "Price", "Market"
    );

    for (i, o) in plan.orders.iter().enumerate() {
        let price = o
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "MKT".to_string());
        println!(
            "  {:>3}  {:4} {:8} {:>8.3} {:>8} {:>10} {:>8} {:6}",
            i + 1,
            o.side,
            o.symbol,
            shares_to_lots(o.held_shares),
            o.target_lot,
            o.quantity,
            price,
            o.market_type.to_string(),
        );
    }

    if !plan.unchanged.is_empty() {
        println!("\n{} symbols already at target.", plan.unchanged.len());
    }
    if !plan.skipped.is_empty() {
        let names: Vec<_> = plan.skipped.iter().map(|s| s.as_str()).collect();
        println!("Skipped (unknown target): {}", names.join(", "));
    }
}
