//! Time-in-force: controls order lifetime on the exchange

use std::fmt;

/// Time-in-force determines how long an order remains active.
///
/// Rebalance orders are always day orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeInForce {
    /// Rest-of-day: rests on the book until filled, cancelled, or the
    /// trading session closes.
    #[default]
    ROD,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::ROD => write!(f, "ROD"),
        }
    }
}
