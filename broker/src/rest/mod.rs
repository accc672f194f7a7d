//! REST broker gateway implementation.

pub mod client;
pub mod types;

use std::time::Duration;

use lotbook::MarketSegment;

use crate::error::BrokerError;
use crate::types::*;
use crate::{Broker, MarketData};
use client::GatewayClient;
use types::LoginRequest;

/// Broker gateway implementing both collaborator traits over HTTP.
///
/// Blocking (sync) via reqwest::blocking. The underlying client pools
/// connections and is safe to share across the dispatcher's worker threads.
pub struct RestGateway {
    client: GatewayClient,
}

impl RestGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BrokerError> {
        Ok(Self {
            client: GatewayClient::new(base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

impl Broker for RestGateway {
    fn login(&self, credentials: &Credentials) -> Result<Session, BrokerError> {
        let cert_path = credentials.cert_path.to_string_lossy();
        let body = LoginRequest {
            id: &credentials.id,
            password: &credentials.password,
            cert_path: &cert_path,
            cert_password: &credentials.cert_password,
        };
        let resp = self.client.login(&body)?;

        match (resp.is_success, resp.data) {
            (true, Some(data)) => Ok(Session::new(data.token, data.accounts)),
            (_, _) => Err(BrokerError::Auth(
                resp.message.unwrap_or_else(|| "login rejected".into()),
            )),
        }
    }

    fn inventories(&self, account: &ActiveAccount) -> Result<Vec<Holding>, BrokerError> {
        let resp = self.client.inventories(account.token(), account.id())?;
        if !resp.is_success {
            return Err(BrokerError::Inventory(
                resp.message.unwrap_or_else(|| "inventory query rejected".into()),
            ));
        }
        Ok(resp.data.unwrap_or_default())
    }

    fn place_order(
        &self,
        account: &ActiveAccount,
        order: &BrokerOrder,
    ) -> Result<OrderResponse, BrokerError> {
        self.client.place_order(account.token(), account.id(), order)
    }
}

impl MarketData for RestGateway {
    fn tickers(
        &self,
        session: &Session,
        segment: MarketSegment,
    ) -> Result<Vec<Ticker>, BrokerError> {
        let resp = self
            .client
            .tickers(session.token(), segment.exchange(), segment.code())?;
        if !resp.is_success {
            return Err(BrokerError::MarketData(
                resp.message
                    .unwrap_or_else(|| format!("ticker query rejected for {segment}")),
            ));
        }
        Ok(resp.data.unwrap_or_default())
    }
}
