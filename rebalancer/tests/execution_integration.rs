// Allow our units.cents digit grouping convention (e.g., 15_50 = 15.50)
#![allow(clippy::inconsistent_digit_grouping)]

//! End-to-end rebalance runs against the mock broker.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lotbook::{MarketSegment, MarketType, Price, PriceType, Side, Symbol};
use lotbook_broker::mock::{MockBroker, MockBrokerBuilder};
use lotbook_broker::{Credentials, OrderType};
use lotbook_rebalancer::audit::AuditLog;
use lotbook_rebalancer::config::Config;
use lotbook_rebalancer::dispatch::Outcome;
use lotbook_rebalancer::error::Error;
use lotbook_rebalancer::execution::{self, RunOptions};
use lotbook_rebalancer::target::DropReason;
use tempfile::TempDir;

const ACCOUNT: &str = "1111111";

fn creds() -> Credentials {
    Credentials {
        id: "A123456789".into(),
        password: "pw".into(),
        cert_path: PathBuf::from("cert.pfx"),
        cert_password: "cpw".into(),
    }
}

/// Tickers for every segment, with 2330 listed twice to exercise the tie-break.
fn listed() -> MockBrokerBuilder {
    MockBroker::builder()
        .with_account(ACCOUNT)
        .with_tickers(MarketSegment::Primary, ["2330", "2317", "2603"])
        .with_tickers(MarketSegment::Otc, ["6488", "2330"])
        .with_tickers(MarketSegment::EmergingBoard, ["7795"])
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self, extra: &str) -> Config {
        let path = self.dir.path().join("config.toml");
        let toml = format!(
            r#"
[connection]
base_url = "http://127.0.0.1:9"

[account]
id = "{ACCOUNT}"

[logging]
dir = '{}'

{extra}
"#,
            self.dir.path().join("logs").display()
        );
        std::fs::write(&path, toml).unwrap();
        Config::load(&path).unwrap()
    }

    fn targets(&self, csv: &str) -> PathBuf {
        let path = self.dir.path().join("targets.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    fn audit_events(&self) -> Vec<String> {
        read_events(&self.dir.path().join("logs").join("audit.jsonl"))
    }
}

fn read_events(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect()
}

fn forced(target_file: PathBuf) -> RunOptions {
    RunOptions {
        dry_run: false,
        force: true,
        target_file,
    }
}

// ============================================================================
// Core scenarios
// ============================================================================

#[test]
fn at_target_places_nothing() {
    let ws = Workspace::new();
    let broker = listed()
        .with_holding("2330", 10_000, OrderType::Stock)
        .build();

    let report = execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,10,\n")),
    )
    .unwrap();

    assert!(report.plan.orders.is_empty());
    assert_eq!(report.plan.unchanged, vec![Symbol::new("2330")]);
    assert!(!report.executed);
    assert!(broker.submitted_orders().is_empty());
    assert!(ws.audit_events().contains(&"no_rebalance_needed".to_string()));
}

#[test]
fn buy_gap_at_market_and_sell_down_at_limit() {
    let ws = Workspace::new();
    let broker = listed()
        .with_holding("2330", 4000, OrderType::Stock)
        .with_holding("2317", 8000, OrderType::Stock)
        .build();

    let report = execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,10,\n2317,3,15.5\n")),
    )
    .unwrap();

    assert!(report.executed);
    assert_eq!(report.summary.accepted, 2);

    let mut sent = broker.submitted_orders();
    sent.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let sell = &sent[0];
    assert_eq!(sell.symbol, Symbol::new("2317"));
    assert_eq!(sell.buy_sell, Side::Sell);
    assert_eq!(sell.quantity, 5000);
    assert_eq!(sell.price, Some(Price(15_50)));
    assert_eq!(sell.price_type, PriceType::Limit);

    let buy = &sent[1];
    assert_eq!(buy.symbol, Symbol::new("2330"));
    assert_eq!(buy.buy_sell, Side::Buy);
    assert_eq!(buy.quantity, 6000);
    assert_eq!(buy.price, None);
    assert_eq!(buy.price_type, PriceType::Market);
    assert_eq!(buy.market_type, MarketType::Common);
}

#[test]
fn unresolved_symbol_dropped_others_continue() {
    let ws = Workspace::new();
    let broker = listed().build();

    let report = execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("9999,5,\n2330,1,\n")),
    )
    .unwrap();

    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].symbol, "9999");
    assert_eq!(report.dropped[0].reason, DropReason::UnresolvedSymbol);

    let sent = broker.submitted_orders();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].symbol, Symbol::new("2330"));
}

#[test]
fn fail_open_inventory_buys_full_targets() {
    let ws = Workspace::new();
    let broker = listed()
        .with_holding("2330", 4000, OrderType::Stock)
        .fail_inventories(2)
        .build();
    let config = ws.config("[inventory]\nretry_delay_ms = 0\non_fetch_failure = \"fail_open\"\n");

    execution::run(
        &broker,
        &config,
        &creds(),
        &forced(ws.targets("2330,10,\n6488,2,\n")),
    )
    .unwrap();

    assert_eq!(broker.inventory_calls(), 2);
    let mut sent = broker.submitted_orders();
    sent.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    assert_eq!(sent[0].quantity, 10_000);
    assert_eq!(sent[1].quantity, 2000);
    assert!(sent.iter().all(|o| o.buy_sell == Side::Buy));
}

#[test]
fn fail_closed_inventory_aborts_before_dispatch() {
    let ws = Workspace::new();
    let broker = listed().fail_inventories(2).build();
    let config = ws.config("[inventory]\nretry_delay_ms = 0\n");

    let err = execution::run(&broker, &config, &creds(), &forced(ws.targets("2330,10,\n")))
        .unwrap_err();

    assert!(matches!(err, Error::InventoryFetchFailed(_)));
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn inventory_retry_recovers() {
    let ws = Workspace::new();
    let broker = listed()
        .with_holding("2330", 10_000, OrderType::Stock)
        .fail_inventories(1)
        .build();
    let config = ws.config("[inventory]\nretry_delay_ms = 0\n");

    let report =
        execution::run(&broker, &config, &creds(), &forced(ws.targets("2330,10,\n"))).unwrap();
    assert!(report.plan.orders.is_empty());
    assert_eq!(broker.inventory_calls(), 2);
}

// ============================================================================
// Loading failures
// ============================================================================

#[test]
fn negative_lot_aborts_without_contacting_broker() {
    let ws = Workspace::new();
    let broker = listed().build();

    let err = execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,10,\n2317,-2,\n")),
    )
    .unwrap_err();

    assert!(matches!(err, Error::NegativeQuantity { line: 2, .. }));
    assert_eq!(broker.ticker_calls(), 0);
    assert_eq!(broker.inventory_calls(), 0);
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn missing_target_file() {
    let ws = Workspace::new();
    let broker = listed().build();
    let opts = forced(ws.dir.path().join("nope.csv"));

    let err = execution::run(&broker, &ws.config(""), &creds(), &opts).unwrap_err();
    assert!(matches!(err, Error::SourceNotFound(_)));
}

#[test]
fn ticker_failure_is_fatal() {
    let ws = Workspace::new();
    let broker = listed().fail_tickers(MarketSegment::EmergingBoard).build();

    let err = execution::run(&broker, &ws.config(""), &creds(), &forced(ws.targets("2330,1,\n")))
        .unwrap_err();
    assert!(matches!(err, Error::MarketData(_)));
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn unknown_account() {
    let ws = Workspace::new();
    let broker = MockBroker::builder().with_account("2222222").build();

    let err = execution::run(&broker, &ws.config(""), &creds(), &forced(ws.targets("2330,1,\n")))
        .unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(ref id) if id == ACCOUNT));
}

#[test]
fn rejected_login() {
    let ws = Workspace::new();
    let broker = listed().reject_login().build();

    let err = execution::run(&broker, &ws.config(""), &creds(), &forced(ws.targets("2330,1,\n")))
        .unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn tickers_fetched_once_per_run() {
    let ws = Workspace::new();
    let broker = listed().build();

    execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,1,\n2317,1,\n6488,1,\n7795,1,30\n")),
    )
    .unwrap();

    assert_eq!(broker.ticker_calls(), MarketSegment::ALL.len());
}

#[test]
fn emerging_symbols_routed_as_emerging() {
    let ws = Workspace::new();
    let broker = listed().build();

    execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("7795,1,30\n6488,1,\n2330,1,\n")),
    )
    .unwrap();

    for o in broker.submitted_orders() {
        let expected = if o.symbol == Symbol::new("7795") {
            MarketType::Emerging
        } else {
            MarketType::Common
        };
        assert_eq!(o.market_type, expected, "{}", o.symbol);
    }
}

#[test]
fn classify_symbols_uses_tie_break() {
    let ws = Workspace::new();
    let broker = listed().build();

    let out = execution::classify_symbols(
        &broker,
        &ws.config(""),
        &creds(),
        &["2330".into(), "6488".into(), "7795".into(), "0000".into()],
    )
    .unwrap();

    assert_eq!(out[0].1, Some(MarketSegment::Primary));
    assert_eq!(out[1].1, Some(MarketSegment::Otc));
    assert_eq!(out[2].1, Some(MarketSegment::EmergingBoard));
    assert_eq!(out[3].1, None);
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn rejected_symbol_does_not_block_others() {
    let ws = Workspace::new();
    let broker = listed()
        .reject_orders_for("2317")
        .fail_orders_for("6488")
        .build();

    let report = execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,1,\n2317,1,\n6488,1,\n2603,1,\n")),
    )
    .unwrap();

    assert_eq!(broker.submitted_orders().len(), 4);
    assert_eq!(report.summary.accepted, 2);
    assert_eq!(report.summary.rejected, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(matches!(report.results[1].outcome, Outcome::Rejected { .. }));

    let events = ws.audit_events();
    assert_eq!(events.iter().filter(|e| *e == "order_result").count(), 4);
    assert_eq!(events.last().map(String::as_str), Some("run_completed"));
}

#[test]
fn single_worker_serializes_submissions() {
    let ws = Workspace::new();
    let broker = listed().submit_delay(Duration::from_millis(5)).build();
    let config = ws.config("[execution]\nmax_concurrency = 1\n");

    execution::run(
        &broker,
        &config,
        &creds(),
        &forced(ws.targets("2330,1,\n2317,1,\n6488,1,\n")),
    )
    .unwrap();

    assert_eq!(broker.submitted_orders().len(), 3);
    assert_eq!(broker.peak_in_flight(), 1);
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn dry_run_submits_nothing() {
    let ws = Workspace::new();
    let broker = listed().build();
    let opts = RunOptions {
        dry_run: true,
        force: false,
        target_file: ws.targets("2330,1,\n"),
    };

    let report = execution::run(&broker, &ws.config(""), &creds(), &opts).unwrap();
    assert_eq!(report.plan.orders.len(), 1);
    assert!(!report.executed);
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn max_orders_per_run_guard() {
    let ws = Workspace::new();
    let broker = listed().build();
    let config = ws.config("[execution]\nmax_orders_per_run = 2\n");

    let err = execution::run(
        &broker,
        &config,
        &creds(),
        &forced(ws.targets("2330,1,\n2317,1,\n6488,1,\n")),
    )
    .unwrap_err();

    assert!(matches!(err, Error::RiskFailed(_)));
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn audit_trail_records_run() {
    let ws = Workspace::new();
    let broker = listed().with_holding("2330", 1000, OrderType::Stock).build();

    execution::run(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,2,600\n")),
    )
    .unwrap();

    assert_eq!(
        ws.audit_events(),
        [
            "run_started",
            "targets_loaded",
            "inventory_fetched",
            "plan_computed",
            "order_result",
            "run_completed",
        ]
    );
}

/// Audit sink that runs out of space at the first order result.
#[derive(Clone, Default)]
struct FullAfterDispatch {
    written: Arc<Mutex<Vec<u8>>>,
    full: Arc<AtomicBool>,
}

impl FullAfterDispatch {
    fn events(&self) -> Vec<String> {
        String::from_utf8(self.written.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["event"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

impl Write for FullAfterDispatch {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let needle = b"\"order_result\"";
        if buf.windows(needle.len()).any(|w| w == needle) {
            self.full.store(true, Ordering::SeqCst);
        }
        if self.full.load(Ordering::SeqCst) {
            return Err(io::Error::other("no space left on device"));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn audit_failure_after_dispatch_still_reports_every_result() {
    let ws = Workspace::new();
    let broker = listed().reject_orders_for("2317").build();
    let sink = FullAfterDispatch::default();
    let mut audit = AuditLog::from_writer(sink.clone());

    let report = execution::run_with_audit(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,1,\n2317,1,\n6488,1,\n")),
        &mut audit,
    )
    .unwrap();

    assert!(report.executed);
    assert_eq!(broker.submitted_orders().len(), 3);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.submitted, 3);
    assert_eq!(report.summary.accepted, 2);
    assert_eq!(report.summary.rejected, 1);
    // Three order results plus the run summary.
    assert_eq!(report.audit_errors.len(), 4);
    assert_eq!(
        sink.events(),
        [
            "run_started",
            "targets_loaded",
            "inventory_fetched",
            "plan_computed",
        ]
    );
}

#[test]
fn audit_failure_before_dispatch_aborts() {
    let ws = Workspace::new();
    let broker = listed().build();
    let sink = FullAfterDispatch::default();
    sink.full.store(true, Ordering::SeqCst);
    let mut audit = AuditLog::from_writer(sink);

    let err = execution::run_with_audit(
        &broker,
        &ws.config(""),
        &creds(),
        &forced(ws.targets("2330,1,\n")),
        &mut audit,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Audit(_)));
    assert!(broker.submitted_orders().is_empty());
}

#[test]
fn positions_reports_stock_holdings() {
    let ws = Workspace::new();
    let broker = listed()
        .with_holding("2330", 4500, OrderType::Stock)
        .with_holding("2317", 1000, OrderType::Margin)
        .build();

    let inv = execution::show_positions(&broker, &ws.config(""), &creds()).unwrap();
    assert_eq!(inv.len(), 1);
    assert_eq!(inv.lots(&Symbol::new("2330")), 4.5);
}
