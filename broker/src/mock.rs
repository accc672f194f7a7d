//! Mock broker for testing: implements `Broker` and `MarketData` with configurable behavior.
//!
//! Use this in tests and dry runs to simulate broker responses without network calls.
//!
//! ```
//! use lotbook::MarketSegment;
//! use lotbook_broker::mock::MockBroker;
//! use lotbook_broker::OrderType;
//!
//! let broker = MockBroker::builder()
//!     .with_account("1111111")
//!     .with_holding("2330", 4000, OrderType::Stock)
//!     .with_tickers(MarketSegment::Primary, ["2330", "2317"])
//!     .build();
//! # let _ = broker;
//! ```

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lotbook::{MarketSegment, Symbol};

use crate::error::BrokerError;
use crate::types::*;
use crate::{Broker, MarketData};

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    accounts: Vec<Account>,
    holdings: Vec<Holding>,
    tickers: Vec<(MarketSegment, Ticker)>,
    inventory_failures: usize,
    ticker_failure: Option<MarketSegment>,
    reject_login: bool,
    rejected: HashSet<Symbol>,
    unreachable: HashSet<Symbol>,
    submit_delay: Duration,
}

impl MockBrokerBuilder {
    pub fn with_account(mut self, id: &str) -> Self {
        self.accounts.push(Account {
            account: id.to_string(),
            name: String::new(),
            branch_no: String::new(),
            account_type: "stock".to_string(),
        });
        self
    }

    pub fn with_holding(mut self, stock_no: &str, today_qty: i64, order_type: OrderType) -> Self {
        self.holdings.push(Holding {
            stock_no: stock_no.to_string(),
            today_qty,
            order_type,
        });
        self
    }

    pub fn with_tickers<'a, I>(mut self, segment: MarketSegment, symbols: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for s in symbols {
            self.tickers.push((
                segment,
                Ticker {
                    symbol: s.to_string(),
                    name: String::new(),
                },
            ));
        }
        self
    }

    /// Fail the first `n` inventory requests with a connection error.
    pub fn fail_inventories(mut self, n: usize) -> Self {
        self.inventory_failures = n;
        self
    }

    /// Fail ticker requests for one segment.
    pub fn fail_tickers(mut self, segment: MarketSegment) -> Self {
        self.ticker_failure = Some(segment);
        self
    }

    pub fn reject_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Orders for `symbol` come back with `is_success: false`.
    pub fn reject_orders_for(mut self, symbol: &str) -> Self {
        self.rejected.insert(Symbol::new(symbol));
        self
    }

    /// Orders for `symbol` fail with a transport error.
    pub fn fail_orders_for(mut self, symbol: &str) -> Self {
        self.unreachable.insert(Symbol::new(symbol));
        self
    }

    /// Sleep this long inside every `place_order` call.
    pub fn submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            accounts: self.accounts,
            holdings: self.holdings,
            tickers: self.tickers,
            inventory_failures: self.inventory_failures,
            ticker_failure: self.ticker_failure,
            reject_login: self.reject_login,
            rejected: self.rejected,
            unreachable: self.unreachable,
            submit_delay: self.submit_delay,
            inventory_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
            next_order_no: AtomicUsize::new(1),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            submitted_orders: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that records submitted orders and returns configurable responses.
pub struct MockBroker {
    accounts: Vec<Account>,
    holdings: Vec<Holding>,
    tickers: Vec<(MarketSegment, Ticker)>,
    inventory_failures: usize,
    ticker_failure: Option<MarketSegment>,
    reject_login: bool,
    rejected: HashSet<Symbol>,
    unreachable: HashSet<Symbol>,
    submit_delay: Duration,
    inventory_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
    next_order_no: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    submitted_orders: Mutex<Vec<BrokerOrder>>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            accounts: Vec::new(),
            holdings: Vec::new(),
            tickers: Vec::new(),
            inventory_failures: 0,
            ticker_failure: None,
            reject_login: false,
            rejected: HashSet::new(),
            unreachable: HashSet::new(),
            submit_delay: Duration::ZERO,
        }
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<BrokerOrder> {
        self.submitted_orders.lock().unwrap().clone()
    }

    /// Number of inventory requests received, including failed ones.
    pub fn inventory_calls(&self) -> usize {
        self.inventory_calls.load(Ordering::SeqCst)
    }

    /// Number of ticker requests received.
    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `place_order` calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Broker for MockBroker {
    fn login(&self, credentials: &Credentials) -> Result<Session, BrokerError> {
        if self.reject_login {
            return Err(BrokerError::Auth(format!(
                "mock: login rejected for {}",
                credentials.id
            )));
        }
        Ok(Session::new("mock-session", self.accounts.clone()))
    }

    fn inventories(&self, _account: &ActiveAccount) -> Result<Vec<Holding>, BrokerError> {
        let call = self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.inventory_failures {
            return Err(BrokerError::Connection(
                "mock: inventory service unavailable".into(),
            ));
        }
        Ok(self.holdings.clone())
    }

    fn place_order(
        &self,
        _account: &ActiveAccount,
        order: &BrokerOrder,
    ) -> Result<OrderResponse, BrokerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.submit_delay.is_zero() {
            std::thread::sleep(self.submit_delay);
        }

        self.submitted_orders.lock().unwrap().push(order.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.contains(&order.symbol) {
            return Err(BrokerError::Connection(format!(
                "mock: order gateway unreachable for {}",
                order.symbol
            )));
        }

        if self.rejected.contains(&order.symbol) {
            return Ok(OrderResponse {
                is_success: false,
                message: Some(format!("mock: order rejected for {}", order.symbol)),
                data: None,
            });
        }

        let order_no = self.next_order_no.fetch_add(1, Ordering::SeqCst);
        Ok(OrderResponse {
            is_success: true,
            message: None,
            data: Some(OrderData {
                order_no: Some(format!("M{order_no:05}")),
                seq_no: None,
                status: Some("submitted".into()),
            }),
        })
    }
}

impl MarketData for MockBroker {
    fn tickers(
        &self,
        _session: &Session,
        segment: MarketSegment,
    ) -> Result<Vec<Ticker>, BrokerError> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.ticker_failure == Some(segment) {
            return Err(BrokerError::MarketData(format!(
                "mock: tickers unavailable for {segment}"
            )));
        }
        Ok(self
            .tickers
            .iter()
            .filter(|(seg, _)| *seg == segment)
            .map(|(_, t)| t.clone())
            .collect())
    }
}
