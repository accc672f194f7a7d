//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during rebalancer operation.
///
/// Row- and symbol-scoped problems (unresolved symbols, unknown quantities,
/// rejected orders) are not errors: they are logged and recorded alongside
/// the results, and never abort sibling work.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("target list not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to parse target list: {0}")]
    Parse(String),

    #[error("line {line}: target lot for {symbol} is negative ({value})")]
    NegativeQuantity {
        line: u64,
        symbol: String,
        value: String,
    },

    #[error("line {line}: symbol {symbol} already listed on line {first_line}")]
    DuplicateSymbol {
        symbol: String,
        first_line: u64,
        line: u64,
    },

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("account {0} is not available for this login")]
    AccountNotFound(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("inventory fetch failed after retry: {0}")]
    InventoryFetchFailed(String),

    #[error("dispatch error: {0}")]
    Dispatch(String),

    #[error("guard failed: {0}")]
    RiskFailed(String),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),

    #[error("orders were dispatched but {0} audit writes failed")]
    AuditIncomplete(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map(|p| p.line());
        match line {
            Some(line) => Error::Parse(format!("line {line}: {e}")),
            None => Error::Parse(e.to_string()),
        }
    }
}
