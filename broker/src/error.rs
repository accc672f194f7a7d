//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("account {0} not available in this session")]
    AccountNotFound(String),

    #[error("inventory error: {0}")]
    Inventory(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("{0}")]
    Other(String),
}
