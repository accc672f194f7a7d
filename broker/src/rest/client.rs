//! Broker gateway REST client.

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{InventoryResponse, LoginRequest, LoginResponse, TickersResponse};
use crate::error::BrokerError;
use crate::types::{BrokerOrder, OrderResponse};

/// Blocking gateway REST client.
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new client for `base_url` (e.g. `https://gateway.example:8443/api/v1`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate (POST /login).
    pub fn login(&self, body: &LoginRequest<'_>) -> Result<LoginResponse, BrokerError> {
        let url = format!("{}/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| BrokerError::Connection(format!("login request failed: {e}")))?;

        parse(resp, BrokerError::Auth)
    }

    /// Inventory rows (GET /accounts/{account}/inventories).
    pub fn inventories(&self, token: &str, account: &str) -> Result<InventoryResponse, BrokerError> {
        let url = format!("{}/accounts/{account}/inventories", self.base_url);
        let resp = authed(self.client.get(&url), token)
            .send()
            .map_err(|e| BrokerError::Connection(format!("inventory request failed: {e}")))?;

        parse(resp, BrokerError::Inventory)
    }

    /// Submit an order (POST /accounts/{account}/orders).
    ///
    /// A 4xx with a JSON envelope is a broker rejection and is returned as a
    /// response, not an error.
    pub fn place_order(
        &self,
        token: &str,
        account: &str,
        order: &BrokerOrder,
    ) -> Result<OrderResponse, BrokerError> {
        let url = format!("{}/accounts/{account}/orders", self.base_url);
        debug!(
            "Submitting order: {} {} {} @ {:?}",
            order.buy_sell, order.quantity, order.symbol, order.price
        );

        let resp = authed(self.client.post(&url), token)
            .json(order)
            .send()
            .map_err(|e| BrokerError::Order(format!("order request failed: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Order(format!("order returned {status}: {body}")));
        }
        if status.as_u16() == 429 {
            return Err(BrokerError::RateLimit);
        }

        resp.json::<OrderResponse>()
            .map_err(|e| BrokerError::Order(format!("failed to parse order response: {e}")))
    }

    /// Listed equities for one market (GET /marketdata/tickers).
    pub fn tickers(
        &self,
        token: &str,
        exchange: &str,
        market: &str,
    ) -> Result<TickersResponse, BrokerError> {
        let url = format!(
            "{}/marketdata/tickers?type=EQUITY&exchange={exchange}&market={market}",
            self.base_url
        );
        let resp = authed(self.client.get(&url), token)
            .send()
            .map_err(|e| BrokerError::MarketData(format!("ticker request failed: {e}")))?;

        parse(resp, BrokerError::MarketData)
    }
}

fn authed(req: RequestBuilder, token: &str) -> RequestBuilder {
    req.bearer_auth(token)
}

/// Check HTTP status and decode the body, tagging failures with `kind`.
fn parse<T: DeserializeOwned>(
    resp: Response,
    kind: fn(String) -> BrokerError,
) -> Result<T, BrokerError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(BrokerError::RateLimit);
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(kind(format!("gateway returned {status}: {body}")));
    }
    resp.json::<T>()
        .map_err(|e| kind(format!("failed to parse response: {e}")))
}
