//! Concurrent order submission.
//!
//! Orders for different symbols have no ordering dependency, so they are
//! submitted in parallel on a dedicated rayon pool. One symbol's failure never
//! cancels another's submission; every result is collected before returning.

use std::fmt;

use log::{error, info, warn};
use lotbook::{Quantity, Side, Symbol};
use lotbook_broker::{ActiveAccount, Broker, OrderResponse};
use rayon::prelude::*;
use serde::Serialize;

use crate::diff::OrderIntent;
use crate::error::{Error, Result};

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Broker accepted the order.
    Accepted { response: OrderResponse },
    /// Broker answered but refused the order.
    Rejected { response: OrderResponse },
    /// The submission itself failed (transport, auth, rate limit).
    Failed { error: String },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accepted { response } => {
                let order_no = response
                    .data
                    .as_ref()
                    .and_then(|d| d.order_no.as_deref())
                    .unwrap_or("-");
                write!(f, "ACCEPTED (order {order_no})")
            }
            Outcome::Rejected { response } => write!(
                f,
                "REJECTED: {}",
                response.message.as_deref().unwrap_or("no reason given")
            ),
            Outcome::Failed { error } => write!(f, "FAILED: {error}"),
        }
    }
}

/// Result for one order intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Counts across a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub submitted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let mut summary = Self {
            submitted: results.len(),
            ..Self::default()
        };
        for r in results {
            match r.outcome {
                Outcome::Accepted { .. } => summary.accepted += 1,
                Outcome::Rejected { .. } => summary.rejected += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} accepted, {} rejected, {} failed",
            self.submitted, self.accepted, self.rejected, self.failed
        )
    }
}

/// Submit every order, at most `max_concurrency` at a time.
///
/// Results come back in the same order as `orders`; completion order is
/// unspecified. Only failing to start the worker pool is an error.
pub fn dispatch<B: Broker + ?Sized>(
    broker: &B,
    account: &ActiveAccount,
    orders: &[OrderIntent],
    max_concurrency: usize,
) -> Result<Vec<DispatchResult>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_concurrency.clamp(1, orders.len()))
        .thread_name(|i| format!("dispatch-{i}"))
        .build()
        .map_err(|e| Error::Dispatch(format!("failed to start order workers: {e}")))?;

    info!(
        "dispatching {} orders ({} at a time)",
        orders.len(),
        pool.current_num_threads()
    );

    Ok(pool.install(|| {
        orders
            .par_iter()
            .map(|order| submit(broker, account, order))
            .collect()
    }))
}

fn submit<B: Broker + ?Sized>(
    broker: &B,
    account: &ActiveAccount,
    order: &OrderIntent,
) -> DispatchResult {
    let wire = order.to_broker_order();
    let outcome = match broker.place_order(account, &wire) {
        Ok(response) if response.is_success => {
            info!(
                "{} {} {}: accepted {}",
                order.side,
                order.quantity,
                order.symbol,
                payload(&response)
            );
            Outcome::Accepted { response }
        }
        Ok(response) => {
            warn!(
                "{} {} {}: rejected {}",
                order.side,
                order.quantity,
                order.symbol,
                payload(&response)
            );
            Outcome::Rejected { response }
        }
        Err(e) => {
            error!(
                "{} {} {}: submission failed: {e}",
                order.side, order.quantity, order.symbol
            );
            Outcome::Failed {
                error: e.to_string(),
            }
        }
    };

    DispatchResult {
        symbol: order.symbol,
        side: order.side,
        quantity: order.quantity,
        outcome,
    }
}

fn payload(response: &OrderResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| format!("{response:?}"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use lotbook::{MarketType, Price, PriceType, TimeInForce};
    use lotbook_broker::mock::MockBroker;
    use lotbook_broker::{Credentials, OrderType};

    use super::*;

    fn order(symbol: &str, side: Side, quantity: Quantity) -> OrderIntent {
        OrderIntent {
            symbol: Symbol::new(symbol),
            side,
            quantity,
            price: Some(Price(100_00)),
            price_type: PriceType::Limit,
            market_type: MarketType::Common,
            time_in_force: TimeInForce::ROD,
            order_type: OrderType::Stock,
            target_lot: 1,
            held_shares: 0,
        }
    }

    fn account(broker: &MockBroker) -> ActiveAccount {
        let creds = Credentials {
            id: "A123456789".into(),
            password: "pw".into(),
            cert_path: PathBuf::from("cert.pfx"),
            cert_password: "cpw".into(),
        };
        broker.login(&creds).unwrap().select("1111111").unwrap()
    }

    #[test]
    fn results_in_input_order() {
        let broker = MockBroker::builder()
            .with_account("1111111")
            .submit_delay(Duration::from_millis(5))
            .build();
        let acct = account(&broker);
        let orders: Vec<_> = ["2330", "2317", "6488", "2603", "00878"]
            .iter()
            .map(|s| order(s, Side::Buy, 1000))
            .collect();

        let results = dispatch(&broker, &acct, &orders, 4).unwrap();
        let syms: Vec<_> = results.iter().map(|r| r.symbol.to_string()).collect();
        assert_eq!(syms, ["2330", "2317", "6488", "2603", "00878"]);
        assert!(results.iter().all(|r| r.outcome.is_accepted()));
        assert_eq!(broker.submitted_orders().len(), 5);
    }

    #[test]
    fn one_failure_does_not_block_others() {
        let broker = MockBroker::builder()
            .with_account("1111111")
            .reject_orders_for("2317")
            .fail_orders_for("6488")
            .build();
        let acct = account(&broker);
        let orders = vec![
            order("2330", Side::Buy, 1000),
            order("2317", Side::Sell, 2000),
            order("6488", Side::Buy, 3000),
            order("2603", Side::Sell, 4000),
        ];

        let results = dispatch(&broker, &acct, &orders, 8).unwrap();
        assert!(results[0].outcome.is_accepted());
        assert!(matches!(results[1].outcome, Outcome::Rejected { .. }));
        assert!(matches!(results[2].outcome, Outcome::Failed { .. }));
        assert!(results[3].outcome.is_accepted());

        let summary = DispatchSummary::from_results(&results);
        assert_eq!(summary.submitted, 4);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn single_worker_serializes() {
        let broker = MockBroker::builder()
            .with_account("1111111")
            .submit_delay(Duration::from_millis(5))
            .build();
        let acct = account(&broker);
        let orders: Vec<_> = ["2330", "2317", "6488"]
            .iter()
            .map(|s| order(s, Side::Buy, 1000))
            .collect();

        dispatch(&broker, &acct, &orders, 1).unwrap();
        assert_eq!(broker.peak_in_flight(), 1);
    }

    #[test]
    fn empty_is_noop() {
        let broker = MockBroker::builder().with_account("1111111").build();
        let acct = account(&broker);
        assert!(dispatch(&broker, &acct, &[], 4).unwrap().is_empty());
        assert!(broker.submitted_orders().is_empty());
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let r = DispatchResult {
            symbol: Symbol::new("2330"),
            side: Side::Buy,
            quantity: 6000,
            outcome: Outcome::Failed {
                error: "timeout".into(),
            },
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "timeout");
        assert_eq!(json["symbol"], "2330");
    }
}
