//! Configuration management for Wallet Watch
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values. These values also seed the
//! defaults of the runtime-editable settings document.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Default alert template
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "New {chain} transaction for {label}: {direction} {amount} {token}. Hash: {hash}";

/// Lower bound for the poll interval in seconds
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound for the poll interval in seconds
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Block explorer endpoints
    #[serde(default)]
    pub explorers: ExplorersConfig,
    /// Alert delivery
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Poll cycle behaviour
    #[serde(default)]
    pub polling: PollingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/wallet_watch.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// One explorer service endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerServiceConfig {
    /// API endpoint
    pub base_url: String,
    /// Etherscan V2 multichain id; omitted for per-chain endpoints
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Prefix that a transaction hash is appended to for a browsable link
    pub tx_url: String,
    /// Initial API key, overridable through settings
    #[serde(default)]
    pub api_key: String,
    /// Requests allowed per second
    #[serde(default = "default_explorer_rate_limit")]
    pub rate_limit_per_second: u32,
}

fn default_explorer_rate_limit() -> u32 {
    5
}

/// Block explorer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorersConfig {
    #[serde(default = "default_etherscan")]
    pub etherscan: ExplorerServiceConfig,
    #[serde(default = "default_bscscan")]
    pub bscscan: ExplorerServiceConfig,
    #[serde(default = "default_solscan")]
    pub solscan: ExplorerServiceConfig,
    /// Per-request timeout in seconds
    #[serde(default = "default_explorer_timeout")]
    pub timeout_secs: u64,
    /// Transactions requested per call
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_etherscan() -> ExplorerServiceConfig {
    ExplorerServiceConfig {
        base_url: "https://api.etherscan.io/api".to_string(),
        chain_id: None,
        tx_url: "https://etherscan.io/tx/".to_string(),
        api_key: String::new(),
        rate_limit_per_second: default_explorer_rate_limit(),
    }
}

fn default_bscscan() -> ExplorerServiceConfig {
    ExplorerServiceConfig {
        base_url: "https://api.bscscan.com/api".to_string(),
        chain_id: None,
        tx_url: "https://bscscan.com/tx/".to_string(),
        api_key: String::new(),
        rate_limit_per_second: default_explorer_rate_limit(),
    }
}

fn default_solscan() -> ExplorerServiceConfig {
    ExplorerServiceConfig {
        base_url: "https://public-api.solscan.io/account/transactions".to_string(),
        chain_id: None,
        tx_url: "https://solscan.io/tx/".to_string(),
        api_key: String::new(),
        rate_limit_per_second: default_explorer_rate_limit(),
    }
}

fn default_explorer_timeout() -> u64 {
    20
}

fn default_page_size() -> u32 {
    20
}

impl Default for ExplorersConfig {
    fn default() -> Self {
        Self {
            etherscan: default_etherscan(),
            bscscan: default_bscscan(),
            solscan: default_solscan(),
            timeout_secs: default_explorer_timeout(),
            page_size: default_page_size(),
        }
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Initial webhook URL; empty disables alerts
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_message_template")]
    pub default_message_template: String,
    /// Webhook request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_message_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

fn default_webhook_timeout() -> u64 {
    10
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            default_message_template: default_message_template(),
            timeout_secs: default_webhook_timeout(),
        }
    }
}

/// Poll cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Initial interval, clamped to [60, 3600]
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Lease lifetime of the poll lock
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    /// Maximum retained log entries
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Seed metadata for newly seen wallets without alerting
    #[serde(default = "default_true")]
    pub baseline_new_wallets: bool,
    /// Run the background scheduler
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Let API requests start a due cycle in the background
    #[serde(default = "default_true")]
    pub lazy_trigger: bool,
}

fn default_interval() -> u64 {
    300
}

fn default_lock_ttl() -> u64 {
    60
}

fn default_log_capacity() -> usize {
    crate::tx_log::DEFAULT_LOG_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            lock_ttl_secs: default_lock_ttl(),
            log_capacity: default_log_capacity(),
            baseline_new_wallets: true,
            enabled: true,
            lazy_trigger: true,
        }
    }
}

/// Clamp a poll interval into the supported range
pub fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            explorers: ExplorersConfig::default(),
            notifications: NotificationsConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (WALLETWATCH_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/wallet_watch.db")?
            .set_default("database.max_connections", 5)?
            .set_default("polling.interval_secs", 300)?
            .set_default("polling.lock_ttl_secs", 60)?
            .set_default("explorers.etherscan.base_url", default_etherscan().base_url)?
            .set_default("explorers.etherscan.tx_url", default_etherscan().tx_url)?
            .set_default("explorers.bscscan.base_url", default_bscscan().base_url)?
            .set_default("explorers.bscscan.tx_url", default_bscscan().tx_url)?
            .set_default("explorers.solscan.base_url", default_solscan().base_url)?
            .set_default("explorers.solscan.tx_url", default_solscan().tx_url)?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false))
            // WALLETWATCH_EXPLORERS__ETHERSCAN__API_KEY=... -> explorers.etherscan.api_key
            .add_source(
                Environment::with_prefix("WALLETWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.log_capacity == 0 {
            return Err(ConfigError::Message(
                "polling.log_capacity must be greater than zero".to_string(),
            ));
        }

        if self.polling.lock_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "polling.lock_ttl_secs must be greater than zero".to_string(),
            ));
        }

        if self.explorers.page_size == 0 {
            return Err(ConfigError::Message(
                "explorers.page_size must be greater than zero".to_string(),
            ));
        }

        for (name, service) in [
            ("etherscan", &self.explorers.etherscan),
            ("bscscan", &self.explorers.bscscan),
            ("solscan", &self.explorers.solscan),
        ] {
            if service.base_url.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "explorers.{}.base_url must be set",
                    name
                )));
            }
            if service.rate_limit_per_second == 0 {
                return Err(ConfigError::Message(format!(
                    "explorers.{}.rate_limit_per_second must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
