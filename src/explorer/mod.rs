//! Block explorer access
//!
//! Explorers report transactions in several response shapes depending on
//! API generation and vendor. Clients normalize them into
//! `TransactionRecord`s and classify failures into `ExplorerError`.

mod etherscan;
pub mod rate_limiter;
mod solscan;

pub use etherscan::EtherscanClient;
pub use rate_limiter::RateLimiter;
pub use solscan::SolscanClient;

use crate::config::{ExplorerServiceConfig, ExplorersConfig};
use crate::models::{Chain, TransactionRecord, TxCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Explorer service backing a chain; error slots and API keys are per service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorerService {
    Etherscan,
    Bscscan,
    Solscan,
}

impl ExplorerService {
    pub const ALL: [ExplorerService; 3] = [
        ExplorerService::Etherscan,
        ExplorerService::Bscscan,
        ExplorerService::Solscan,
    ];

    pub fn for_chain(chain: Chain) -> Self {
        match chain {
            Chain::Eth => ExplorerService::Etherscan,
            Chain::Bsc => ExplorerService::Bscscan,
            Chain::Sol => ExplorerService::Solscan,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExplorerService::Etherscan => "etherscan",
            ExplorerService::Bscscan => "bscscan",
            ExplorerService::Solscan => "solscan",
        }
    }

    /// Whether calls are refused without an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ExplorerService::Solscan)
    }
}

impl fmt::Display for ExplorerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of the window a page is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrder {
    /// Oldest first from `start_block`, so a backlog larger than one page
    /// drains over successive cycles
    Ascending,
    /// Newest page only, used to seed a baseline
    NewestFirst,
}

impl FetchOrder {
    pub fn as_sort_param(&self) -> &'static str {
        match self {
            FetchOrder::Ascending => "asc",
            FetchOrder::NewestFirst => "desc",
        }
    }
}

/// Parameters for one explorer call
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub chain: Chain,
    pub address: String,
    pub api_key: String,
    pub category: TxCategory,
    /// Lowest block of interest (the category watermark)
    pub start_block: u64,
    pub page_size: u32,
    pub order: FetchOrder,
}

/// Explorer failure classes
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("No API key configured for {0}")]
    MissingApiKey(ExplorerService),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("{category} transactions are not available on {chain}")]
    Unsupported { chain: Chain, category: TxCategory },
}

impl From<reqwest::Error> for ExplorerError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ExplorerError::Http {
                status: status.as_u16(),
            };
        }
        if err.is_timeout() {
            return ExplorerError::Transport("request timed out".to_string());
        }
        ExplorerError::Transport(err.to_string())
    }
}

/// Source of recent transactions for an address
#[async_trait]
pub trait Explorer: Send + Sync {
    /// One page of transactions at or above `start_block`, taken from the
    /// end `request.order` names. Records may come back in any order.
    /// "No transactions" is `Ok(vec![])`.
    async fn fetch_latest(&self, request: &FetchRequest) -> Result<Vec<TransactionRecord>, ExplorerError>;
}

type Extraction = fn(&Value) -> Option<&Vec<Value>>;

fn top_level(body: &Value) -> Option<&Vec<Value>> {
    body.as_array()
}

fn result(body: &Value) -> Option<&Vec<Value>> {
    body.get("result")?.as_array()
}

fn data(body: &Value) -> Option<&Vec<Value>> {
    body.get("data")?.as_array()
}

fn data_transactions(body: &Value) -> Option<&Vec<Value>> {
    body.get("data")?.get("transactions")?.as_array()
}

fn data_items(body: &Value) -> Option<&Vec<Value>> {
    body.get("data")?.get("items")?.as_array()
}

fn transactions(body: &Value) -> Option<&Vec<Value>> {
    body.get("transactions")?.as_array()
}

fn items(body: &Value) -> Option<&Vec<Value>> {
    body.get("items")?.as_array()
}

/// Transaction array locations, tried in order
const EXTRACTIONS: [(&str, Extraction); 7] = [
    ("top-level array", top_level),
    ("result", result),
    ("data", data),
    ("data.transactions", data_transactions),
    ("data.items", data_items),
    ("transactions", transactions),
    ("items", items),
];

fn is_no_transactions(message: &str) -> bool {
    message.to_ascii_lowercase().contains("no transactions found")
}

fn status_is_zero(status: &Value) -> bool {
    match status {
        Value::String(s) => s.trim() == "0",
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Classify an explorer body and pull out its transaction array
pub fn extract_transactions(body: &Value) -> Result<Vec<Value>, ExplorerError> {
    if let Some(obj) = body.as_object() {
        if let Some(error) = obj.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .or_else(|| error.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| error.to_string());
            return Err(ExplorerError::Api(message));
        }

        if obj.get("success").and_then(Value::as_bool) == Some(false) {
            let message = text_field(body, &["message", "msg"]).unwrap_or_else(|| "request unsuccessful".to_string());
            return Err(ExplorerError::Api(message));
        }

        if obj.get("status").is_some_and(status_is_zero) {
            let message = text_field(body, &["message"]).unwrap_or_default();
            if is_no_transactions(&message) {
                return Ok(Vec::new());
            }
            // Etherscan puts the real reason in `result` when it is a string
            let detail = obj.get("result").and_then(Value::as_str).unwrap_or_default();
            let message = match (message.is_empty(), detail.is_empty()) {
                (false, false) => format!("{}: {}", message, detail),
                (false, true) => message,
                (true, false) => detail.to_string(),
                (true, true) => "status 0".to_string(),
            };
            return Err(ExplorerError::Api(message));
        }
    }

    for (name, extract) in EXTRACTIONS.iter() {
        if let Some(items) = extract(body) {
            tracing::trace!(shape = *name, count = items.len(), "Extracted transactions");
            return Ok(items.clone());
        }
    }

    Err(ExplorerError::Malformed("no transaction array in response".to_string()))
}

/// First present field among aliases, as text
pub fn text_field(item: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First present field among aliases, as an unsigned integer
pub fn u64_field(item: &Value, aliases: &[&str]) -> Option<u64> {
    aliases.iter().find_map(|key| match item.get(*key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

async fn read_json(response: reqwest::Response) -> Result<Value, ExplorerError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ExplorerError::Http {
            status: status.as_u16(),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ExplorerError::Malformed(e.to_string()))
}

/// Explorer clients by chain
#[derive(Clone, Default)]
pub struct ExplorerRegistry {
    clients: HashMap<Chain, Arc<dyn Explorer>>,
}

impl ExplorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP clients for every supported chain
    pub fn from_config(config: &ExplorersConfig) -> Result<Self, ExplorerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExplorerError::Transport(e.to_string()))?;

        let evm = |chain: Chain, service: ExplorerService, cfg: &ExplorerServiceConfig| {
            Arc::new(EtherscanClient::new(http.clone(), chain, service, cfg)) as Arc<dyn Explorer>
        };

        Ok(Self::new()
            .with(Chain::Eth, evm(Chain::Eth, ExplorerService::Etherscan, &config.etherscan))
            .with(Chain::Bsc, evm(Chain::Bsc, ExplorerService::Bscscan, &config.bscscan))
            .with(Chain::Sol, Arc::new(SolscanClient::new(http.clone(), &config.solscan))))
    }

    pub fn with(mut self, chain: Chain, explorer: Arc<dyn Explorer>) -> Self {
        self.clients.insert(chain, explorer);
        self
    }

    pub fn for_chain(&self, chain: Chain) -> Option<Arc<dyn Explorer>> {
        self.clients.get(&chain).cloned()
    }
}
