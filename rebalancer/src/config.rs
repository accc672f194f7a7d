//! TOML configuration loading and validation.
//!
//! Secrets never live in the config file: credentials come from the
//! environment (see [`credentials_from_env`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use lotbook_broker::Credentials;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Broker gateway base URL.
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Account number to trade; must be one of the accounts the login returns.
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Skip the first row of the target list as column labels.
    #[serde(default)]
    pub has_header: bool,
}

/// What to do when the inventory fetch fails twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Proceed with an empty inventory: every positive target becomes a full buy.
    FailOpen,
    /// Abort the run before any order is placed.
    #[default]
    FailClosed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub on_fetch_failure: FetchFailurePolicy,
}

fn default_retry_delay() -> u64 {
    500
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay(),
            on_fetch_failure: FetchFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Order submissions in flight at once. 1 serializes dispatch.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
}

fn default_concurrency() -> usize {
    8
}
fn default_max_orders() -> usize {
    50
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            max_orders_per_run: default_max_orders(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.connection.base_url.trim().is_empty() {
            return Err(Error::Config("connection.base_url must not be empty".into()));
        }
        if !self.connection.base_url.starts_with("http://")
            && !self.connection.base_url.starts_with("https://")
        {
            return Err(Error::Config(
                "connection.base_url must start with http:// or https://".into(),
            ));
        }
        if self.connection.timeout_secs == 0 {
            return Err(Error::Config("connection.timeout_secs must be > 0".into()));
        }
        if self.account.id.trim().is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        if self.execution.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be >= 1".into()));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be >= 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.inventory.retry_delay_ms)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

pub const ENV_ID: &str = "LOTBOOK_ID";
pub const ENV_PASSWORD: &str = "LOTBOOK_PASSWORD";
pub const ENV_CERT_PATH: &str = "LOTBOOK_CERT_PATH";
pub const ENV_CERT_PASSWORD: &str = "LOTBOOK_CERT_PASSWORD";

/// Read login credentials from the process environment.
pub fn credentials_from_env() -> Result<Credentials> {
    credentials_from(|key| std::env::var(key).ok())
}

/// Build credentials from any key lookup (the environment in production).
pub fn credentials_from<F>(lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &'static str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(Error::MissingEnv(key))
    };

    Ok(Credentials {
        id: get(ENV_ID)?,
        password: get(ENV_PASSWORD)?,
        cert_path: PathBuf::from(get(ENV_CERT_PATH)?),
        cert_password: get(ENV_CERT_PASSWORD)?,
    })
}
