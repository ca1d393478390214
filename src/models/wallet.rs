//! Wallet models - tracked addresses and their dedup state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Maximum number of transaction hashes remembered per wallet
pub const RECENT_HASH_CAP: usize = 50;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Ethereum mainnet
    Eth,
    /// BNB Smart Chain
    Bsc,
    /// Solana mainnet
    Sol,
}

impl Chain {
    /// Lower-case identifier used for storage keys and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
            Chain::Sol => "sol",
        }
    }

    /// Symbol of the chain's native coin
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Bsc => "BNB",
            Chain::Sol => "SOL",
        }
    }

    /// Decimals of the chain's native coin
    pub fn native_decimals(&self) -> u8 {
        match self {
            Chain::Eth | Chain::Bsc => 18,
            Chain::Sol => 9,
        }
    }

    /// EVM chains use hex addresses and hashes that compare case-insensitively
    pub fn is_evm(&self) -> bool {
        matches!(self, Chain::Eth | Chain::Bsc)
    }

    /// Normalize an address for storage and comparison.
    ///
    /// EVM addresses are lower-cased; Solana base58 is case-sensitive and
    /// only has whitespace removed.
    pub fn normalize_address(&self, address: &str) -> String {
        let compact: String = address.chars().filter(|c| !c.is_whitespace()).collect();
        if self.is_evm() {
            compact.to_lowercase()
        } else {
            compact
        }
    }

    /// Normalize a transaction hash for dedup comparison
    pub fn normalize_hash(&self, hash: &str) -> String {
        if self.is_evm() {
            hash.trim().to_lowercase()
        } else {
            hash.trim().to_string()
        }
    }

    /// Check that an already-normalized address is well formed for this chain
    pub fn is_valid_address(&self, address: &str) -> bool {
        match self {
            Chain::Eth | Chain::Bsc => {
                address.len() == 42
                    && address.starts_with("0x")
                    && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
            }
            Chain::Sol => {
                (32..=44).contains(&address.len())
                    && address.bytes().all(|b| {
                        b.is_ascii_alphanumeric() && !matches!(b, b'0' | b'O' | b'I' | b'l')
                    })
            }
        }
    }

    /// Transaction categories tracked on this chain
    pub fn categories(&self) -> &'static [TxCategory] {
        match self {
            Chain::Eth | Chain::Bsc => &[TxCategory::Native, TxCategory::Token],
            Chain::Sol => &[TxCategory::Native],
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Eth => write!(f, "ETH"),
            Chain::Bsc => write!(f, "BSC"),
            Chain::Sol => write!(f, "SOL"),
        }
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eth" | "ethereum" => Ok(Chain::Eth),
            "bsc" | "bnb" => Ok(Chain::Bsc),
            "sol" | "solana" => Ok(Chain::Sol),
            other => Err(format!("unsupported chain: {}", other)),
        }
    }
}

/// Transaction category, each with its own watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxCategory {
    /// Native coin transfers
    Native,
    /// Token (ERC-20 / BEP-20) transfers
    Token,
}

impl TxCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxCategory::Native => "native",
            TxCategory::Token => "token",
        }
    }
}

impl fmt::Display for TxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Opaque stable identifier
    pub id: String,
    pub chain: Chain,
    /// Normalized address
    pub address: String,
    #[serde(default)]
    pub label: String,
    /// Per-wallet alert template; empty means the global default
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message_template: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Storage key shared by the wallet and its metadata
    pub fn key(&self) -> String {
        meta_key(&self.address, self.chain)
    }

    /// Label for display, falling back to the address
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.address
        } else {
            &self.label
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Key for per-wallet metadata: `chain:address`
pub fn meta_key(address: &str, chain: Chain) -> String {
    format!("{}:{}", chain.as_str(), chain.normalize_address(address))
}

/// Request to start tracking a wallet
#[derive(Debug, Clone, Deserialize)]
pub struct NewWallet {
    #[serde(default)]
    pub id: Option<String>,
    pub chain: String,
    pub address: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub message_template: Option<String>,
}

/// Editable wallet fields; watermarks are never touched by an update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletPatch {
    pub label: Option<String>,
    pub message_template: Option<String>,
}

/// Per-wallet dedup state: category watermarks plus a bounded hash window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletMeta {
    #[serde(default)]
    pub last_native_block: u64,
    #[serde(default)]
    pub last_token_block: u64,
    /// Oldest first
    #[serde(default)]
    pub recent_hashes: VecDeque<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WalletMeta {
    /// Current watermark for a category
    pub fn watermark(&self, category: TxCategory) -> u64 {
        match category {
            TxCategory::Native => self.last_native_block,
            TxCategory::Token => self.last_token_block,
        }
    }

    pub fn has_seen(&self, hash: &str) -> bool {
        self.recent_hashes.iter().any(|h| h == hash)
    }

    /// Whether a candidate is new: unseen hash and not below the watermark
    pub fn is_new(&self, category: TxCategory, hash: &str, block: u64) -> bool {
        !hash.is_empty() && !self.has_seen(hash) && block >= self.watermark(category)
    }

    /// Record a transaction as processed
    pub fn record(&mut self, category: TxCategory, hash: &str, block: u64) {
        if !self.has_seen(hash) {
            self.recent_hashes.push_back(hash.to_string());
            while self.recent_hashes.len() > RECENT_HASH_CAP {
                self.recent_hashes.pop_front();
            }
        }

        let watermark = match category {
            TxCategory::Native => &mut self.last_native_block,
            TxCategory::Token => &mut self.last_token_block,
        };
        *watermark = (*watermark).max(block);
    }

    /// Apply the dedup rule; returns true and records the hash when new
    pub fn admit(&mut self, category: TxCategory, hash: &str, block: u64) -> bool {
        if !self.is_new(category, hash, block) {
            return false;
        }
        self.record(category, hash, block);
        true
    }
}
