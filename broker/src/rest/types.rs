//! Gateway-specific request and response bodies.

use serde::{Deserialize, Serialize};

use crate::types::{Account, Holding, Ticker};

/// Every gateway response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub is_success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// POST /login body. No `Debug`: it carries secrets.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub id: &'a str,
    pub password: &'a str,
    pub cert_path: &'a str,
    pub cert_password: &'a str,
}

/// POST /login payload.
#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

pub type LoginResponse = Envelope<LoginData>;
pub type InventoryResponse = Envelope<Vec<Holding>>;
pub type TickersResponse = Envelope<Vec<Ticker>>;
