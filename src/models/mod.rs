//! Domain models

pub mod transaction;
pub mod wallet;

pub use transaction::{Direction, TransactionLogEntry, TransactionRecord};
pub use wallet::{meta_key, Chain, NewWallet, TxCategory, Wallet, WalletMeta, WalletPatch, RECENT_HASH_CAP};
