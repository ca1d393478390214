//! Bounded, newest-first transaction log

use crate::models::TransactionLogEntry;
use crate::store::{keys, KeyValueStore, StoreError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of retained entries
pub const DEFAULT_LOG_CAPACITY: usize = 200;

pub struct TransactionLog {
    kv: Arc<dyn KeyValueStore>,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl TransactionLog {
    pub fn new(kv: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            kv,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    async fn load(&self) -> Result<Vec<TransactionLogEntry>, StoreError> {
        Ok(self
            .kv
            .get_json::<Vec<TransactionLogEntry>>(keys::TX_LOG)
            .await?
            .unwrap_or_default())
    }

    pub async fn append(&self, entry: TransactionLogEntry) -> Result<(), StoreError> {
        self.append_batch(vec![entry]).await
    }

    /// Prepend entries given oldest to newest, so the newest ends up first
    pub async fn append_batch(&self, entries: Vec<TransactionLogEntry>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let existing = self.load().await?;

        let mut log: Vec<TransactionLogEntry> = entries.into_iter().rev().collect();
        log.extend(existing);
        log.truncate(self.capacity);

        self.kv.set_json(keys::TX_LOG, &log).await
    }

    /// Newest entries first, at most `limit` of them
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<TransactionLogEntry>, StoreError> {
        let mut log = self.load().await?;
        if let Some(limit) = limit {
            log.truncate(limit);
        }
        Ok(log)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.delete(keys::TX_LOG).await
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load().await?.len())
    }
}
