//! Rebalance audit trail.
//!
//! A run appends, in order: `run_started`, `targets_loaded` (intents plus
//! dropped rows with reasons), `inventory_fetched` (flagged when the empty
//! fallback was used), `plan_computed`, then either `no_rebalance_needed` or
//! an optional `user_confirmed` followed by one `order_result` per symbol and
//! a closing `run_completed` summary. One JSON object per line, each stamped
//! with `ts` in UTC.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diff::{OrderIntent, Plan};
use crate::dispatch::{DispatchResult, DispatchSummary};
use crate::error::Result;
use crate::inventory::InventoryMap;
use crate::target::LoadedTargets;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: Box<dyn Write + Send>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self::from_writer(BufWriter::new(file)))
    }

    /// Write events to an arbitrary sink instead of a file.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_run_started(
    audit: &mut AuditLog,
    target_file: &str,
    account_id: &str,
    dry_run: bool,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "target_file": target_file,
            "account": account_id,
            "dry_run": dry_run,
        }),
    )
}

pub fn log_targets_loaded(audit: &mut AuditLog, loaded: &LoadedTargets) -> Result<()> {
    audit.log(
        "targets_loaded",
        serde_json::json!({
            "intents": loaded.intents,
            "dropped": loaded.dropped,
        }),
    )
}

pub fn log_inventory(audit: &mut AuditLog, inventory: &InventoryMap) -> Result<()> {
    let positions: Vec<_> = inventory
        .iter_sorted()
        .into_iter()
        .map(|(symbol, shares)| {
            serde_json::json!({
                "symbol": symbol.as_str(),
                "shares": shares,
            })
        })
        .collect();

    audit.log(
        "inventory_fetched",
        serde_json::json!({
            "positions": positions,
            "fallback": inventory.is_fallback(),
        }),
    )
}

fn order_json(o: &OrderIntent) -> serde_json::Value {
    serde_json::json!({
        "symbol": o.symbol.as_str(),
        "side": o.side.to_string(),
        "quantity": o.quantity,
        "price": o.price.map(|p| p.to_decimal_string()),
        "price_type": o.price_type.to_string(),
        "market_type": o.market_type.to_string(),
        "time_in_force": o.time_in_force.to_string(),
        "target_lot": o.target_lot,
        "held_shares": o.held_shares,
    })
}

pub fn log_plan(audit: &mut AuditLog, plan: &Plan) -> Result<()> {
    let orders: Vec<_> = plan.orders.iter().map(order_json).collect();
    let unchanged: Vec<_> = plan.unchanged.iter().map(|s| s.as_str()).collect();
    let skipped: Vec<_> = plan.skipped.iter().map(|s| s.as_str()).collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "orders": orders,
            "unchanged": unchanged,
            "skipped": skipped,
        }),
    )
}

pub fn log_order_result(audit: &mut AuditLog, result: &DispatchResult) -> Result<()> {
    let data = serde_json::to_value(result)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("order_result", data)
}

pub fn log_run_completed(audit: &mut AuditLog, summary: &DispatchSummary) -> Result<()> {
    let data = serde_json::to_value(summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("run_completed", data)
}
