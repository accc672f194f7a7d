//! Current holdings snapshot, taken once per run.

use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use lotbook::{Symbol, shares_to_lots};
use lotbook_broker::{ActiveAccount, Broker, BrokerError, Holding, OrderType};
use rustc_hash::FxHashMap;

use crate::config::FetchFailurePolicy;
use crate::error::{Error, Result};

/// Held shares per symbol, stock positions only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryMap {
    shares: FxHashMap<Symbol, i64>,
    fallback: bool,
}

impl InventoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from broker rows. Non-stock rows are ignored; several stock
    /// rows for one symbol are summed.
    pub fn from_holdings(holdings: &[Holding]) -> Self {
        let mut map = Self::new();
        for h in holdings {
            if h.order_type != OrderType::Stock {
                debug!("ignoring {:?} holding of {}", h.order_type, h.stock_no);
                continue;
            }
            let Some(symbol) = Symbol::try_new(&h.stock_no) else {
                warn!("ignoring holding with unusable symbol {:?}", h.stock_no);
                continue;
            };
            let entry = map.shares.entry(symbol).or_insert(0);
            *entry = entry.saturating_add(h.today_qty);
        }
        map
    }

    /// Empty inventory standing in for a failed fetch.
    pub fn fallback() -> Self {
        Self {
            shares: FxHashMap::default(),
            fallback: true,
        }
    }

    /// True when this snapshot is the empty stand-in for a failed fetch.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Whole shares held (0 if absent).
    pub fn shares(&self, symbol: &Symbol) -> i64 {
        self.shares.get(symbol).copied().unwrap_or(0)
    }

    /// Lots held; fractional for odd-lot positions.
    pub fn lots(&self, symbol: &Symbol) -> f64 {
        shares_to_lots(self.shares(symbol))
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// `(symbol, shares)` pairs sorted by symbol.
    pub fn iter_sorted(&self) -> Vec<(Symbol, i64)> {
        let mut rows: Vec<_> = self.shares.iter().map(|(s, q)| (*s, *q)).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

/// Fetch the account's inventory, retrying once after `retry_delay`.
///
/// A second failure either aborts ([`FetchFailurePolicy::FailClosed`]) or
/// yields an empty snapshot ([`FetchFailurePolicy::FailOpen`]).
pub fn fetch_inventory<B: Broker + ?Sized>(
    broker: &B,
    account: &ActiveAccount,
    policy: FetchFailurePolicy,
    retry_delay: Duration,
) -> Result<InventoryMap> {
    let holdings = match broker.inventories(account) {
        Ok(rows) => Ok(rows),
        Err(first) => {
            warn!("inventory fetch failed, retrying once: {first}");
            if !retry_delay.is_zero() {
                thread::sleep(retry_delay);
            }
            broker.inventories(account)
        }
    };

    match holdings {
        Ok(rows) => {
            let map = InventoryMap::from_holdings(&rows);
            info!(
                "inventory: {} stock positions ({} rows reported)",
                map.len(),
                rows.len()
            );
            Ok(map)
        }
        Err(e) => on_failure(e, policy),
    }
}

fn on_failure(e: BrokerError, policy: FetchFailurePolicy) -> Result<InventoryMap> {
    match policy {
        FetchFailurePolicy::FailClosed => Err(Error::InventoryFetchFailed(e.to_string())),
        FetchFailurePolicy::FailOpen => {
            error!(
                "inventory fetch failed after retry ({e}); continuing with an EMPTY inventory, \
                 every positive target will be bought in full"
            );
            Ok(InventoryMap::fallback())
        }
    }
}
