//! Wallet Watch Library
//!
//! Polls ETH, BSC and SOL addresses through block-explorer APIs, detects
//! transactions not seen before, keeps a bounded transaction log and posts
//! alerts to a webhook. This library exposes core modules for testing.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod settings;
pub mod store;
pub mod tx_log;
pub mod utils;
pub mod wallets;

// Re-export commonly used types for tests
pub use config::AppConfig;
pub use engine::{PollEngine, PollEngineConfig, PollLock, PollOutcome, PollReport, PollTrigger};
pub use error::AppError;
pub use explorer::{Explorer, ExplorerError, ExplorerRegistry, ExplorerService, FetchOrder, FetchRequest};
pub use models::{Chain, Direction, TransactionLogEntry, TransactionRecord, TxCategory, Wallet, WalletMeta};
pub use notifications::{AlertDispatcher, WebhookNotifier, WebhookSink};
pub use settings::{GlobalSettings, SettingsStore};
pub use store::{KeyValueStore, MemoryKvStore, SqliteKvStore, StoreError};
pub use tx_log::TransactionLog;
pub use wallets::{WalletError, WalletStore};
