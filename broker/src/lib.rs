//! Broker and market-data collaborator traits for lotbook.
//!
//! The rebalancer never talks to a brokerage directly; it goes through the
//! [`Broker`] and [`MarketData`] traits. Implementations:
//!
//! - **Mock** (always available): in-memory, records submitted orders
//! - **REST** (feature `rest`): blocking JSON client for a broker gateway
//!
//! Both traits require `Send + Sync`: order submissions for different
//! symbols run concurrently against one shared handle.

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "rest")]
pub mod rest;

pub use error::BrokerError;
pub use types::*;

use lotbook::MarketSegment;

/// Account-side operations: login, inventory, order placement.
pub trait Broker: Send + Sync {
    /// Authenticate and list the accounts this login may trade.
    fn login(&self, credentials: &Credentials) -> Result<Session, BrokerError>;

    /// Current inventory rows for the account (all instrument types).
    fn inventories(&self, account: &ActiveAccount) -> Result<Vec<Holding>, BrokerError>;

    /// Submit one order. A broker-side rejection comes back as
    /// `Ok(OrderResponse { is_success: false, .. })`; transport failures as `Err`.
    fn place_order(
        &self,
        account: &ActiveAccount,
        order: &BrokerOrder,
    ) -> Result<OrderResponse, BrokerError>;
}

/// Market-data lookups.
pub trait MarketData: Send + Sync {
    /// All equity tickers listed on one segment.
    fn tickers(&self, session: &Session, segment: MarketSegment)
    -> Result<Vec<Ticker>, BrokerError>;
}
