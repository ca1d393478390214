//! Durable key/value storage
//!
//! Every piece of persistent state (wallets, metadata, the transaction log,
//! settings, poll run state) is a JSON document stored under a fixed key.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Storage keys
pub mod keys {
    pub const WALLETS: &str = "wallets";
    pub const WALLET_META: &str = "wallet_meta";
    pub const TX_LOG: &str = "tx_log";
    pub const SETTINGS: &str = "settings";
    pub const POLL_STATE: &str = "poll_state";
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON key/value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the document stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace the document stored under `key`
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key`; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl dyn KeyValueStore {
    /// Fetch and decode a typed document
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a typed document
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }
}
