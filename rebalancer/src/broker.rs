//! Broker gateway construction for the CLI.

use lotbook_broker::rest::RestGateway;

use crate::config::Config;
use crate::error::{Error, Result};

/// Build the REST gateway described by `[connection]`.
///
/// No request is made here; the first network call is the login.
pub fn connect_gateway(config: &Config) -> Result<RestGateway> {
    RestGateway::new(&config.connection.base_url, config.timeout())
        .map_err(|e| Error::Connection(e.to_string()))
}
