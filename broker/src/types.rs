//! Shared broker types: credentials, sessions, holdings, orders, tickers.

use std::fmt;
use std::path::PathBuf;

use lotbook::{MarketType, Price, PriceType, Quantity, Side, Symbol, TimeInForce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::BrokerError;

/// Login credentials. Secrets are wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    pub id: String,
    pub password: String,
    pub cert_path: PathBuf,
    pub cert_password: String,
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.zeroize();
        self.cert_password.zeroize();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("password", &"***")
            .field("cert_path", &self.cert_path)
            .field("cert_password", &"***")
            .finish()
    }
}

/// A trading account available to the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account number used to select the account.
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch_no: String,
    #[serde(default)]
    pub account_type: String,
}

/// An authenticated session: the token and the accounts it may trade.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    accounts: Vec<Account>,
}

impl Session {
    pub fn new(token: impl Into<String>, accounts: Vec<Account>) -> Self {
        Self {
            token: token.into(),
            accounts,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Pick the account to trade with.
    ///
    /// This is the only way to obtain an [`ActiveAccount`], so every
    /// account-scoped broker call is statically tied to a live session.
    pub fn select(&self, account_id: &str) -> Result<ActiveAccount, BrokerError> {
        self.accounts
            .iter()
            .find(|a| a.account == account_id)
            .map(|a| ActiveAccount {
                token: self.token.clone(),
                account: a.clone(),
            })
            .ok_or_else(|| BrokerError::AccountNotFound(account_id.to_string()))
    }
}

/// The account selected for this run, bound to the session that selected it.
#[derive(Debug, Clone)]
pub struct ActiveAccount {
    token: String,
    account: Account,
}

impl ActiveAccount {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn id(&self) -> &str {
        &self.account.account
    }
}

/// Instrument type of a holding or an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Cash stock.
    #[default]
    Stock,
    Margin,
    Short,
    DayTrade,
    /// Securities lending and anything else the broker reports.
    #[serde(other)]
    Other,
}

/// One inventory row as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub stock_no: String,
    /// Shares held as of today.
    pub today_qty: i64,
    pub order_type: OrderType,
}

/// Order to submit to a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub symbol: Symbol,
    pub buy_sell: Side,
    /// Shares, not lots.
    pub quantity: Quantity,
    /// `None` for market orders. Sent as a decimal string (`"15.50"`).
    #[serde(with = "decimal_price")]
    pub price: Option<Price>,
    pub price_type: PriceType,
    pub market_type: MarketType,
    pub time_in_force: TimeInForce,
    pub order_type: OrderType,
}

/// Details returned for an accepted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    #[serde(default)]
    pub order_no: Option<String>,
    #[serde(default)]
    pub seq_no: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Broker response to an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub is_success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<OrderData>,
}

/// A listed symbol from the market-data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

/// Optional prices travel as decimal strings, never as raw cents.
mod decimal_price {
    use lotbook::Price;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(price: &Option<Price>, s: S) -> Result<S::Ok, S::Error> {
        match price {
            Some(p) => s.serialize_some(&p.to_decimal_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Price>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| Price::parse_decimal(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
