//! lotbook-rebalancer: bring a lot-based equities account in line with a
//! target list.
//!
//! Reads `symbol, target_lot, limit_price` rows from a CSV file, classifies
//! each symbol by market segment, diffs the targets against the account's
//! stock inventory, and submits one order per symbol that is off target,
//! concurrently, with an audit trail.

pub mod audit;
pub mod broker;
pub mod classify;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod inventory;
pub mod target;
