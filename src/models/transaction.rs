//! Transaction models - normalized explorer records and log entries

use super::wallet::{Chain, TxCategory, Wallet};
use serde::{Deserialize, Serialize};

/// Transfer direction relative to the tracked wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Inbound when the wallet is the recipient
    pub fn resolve(chain: Chain, wallet_address: &str, to: &str) -> Self {
        let matches = if chain.is_evm() {
            to.eq_ignore_ascii_case(wallet_address)
        } else {
            to == wallet_address
        };
        if matches {
            Direction::In
        } else {
            Direction::Out
        }
    }

    /// Verb used in alert messages
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::In => "received",
            Direction::Out => "sent",
        }
    }
}

/// A transaction as reported by an explorer, after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub block_number: u64,
    pub timestamp: i64,
    /// Human-readable amount
    pub amount: String,
    pub token: String,
    pub explorer_url: String,
}

/// One row in the bounded transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: String,
    pub wallet_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub address: String,
    pub chain: Chain,
    #[serde(default = "default_category")]
    pub category: TxCategory,
    pub hash: String,
    pub direction: Direction,
    pub amount: String,
    pub token: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub block_number: u64,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub explorer_url: String,
    #[serde(default)]
    pub message: String,
}

fn default_category() -> TxCategory {
    TxCategory::Native
}

impl TransactionLogEntry {
    /// Build a log entry for an accepted transaction
    pub fn from_record(wallet: &Wallet, category: TxCategory, record: &TransactionRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: wallet.id.clone(),
            label: wallet.label.clone(),
            address: wallet.address.clone(),
            chain: wallet.chain,
            category,
            hash: record.hash.clone(),
            direction: Direction::resolve(wallet.chain, &wallet.address, &record.to),
            amount: record.amount.clone(),
            token: record.token.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            block_number: record.block_number,
            timestamp: record.timestamp,
            explorer_url: record.explorer_url.clone(),
            message: String::new(),
        }
    }
}
