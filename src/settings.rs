//! Runtime-editable global settings
//!
//! Settings are persisted as a single JSON document. On every read the stored
//! document is overlaid onto defaults derived from `AppConfig`, so fields
//! added later are backfilled without losing existing values.

use crate::config::{clamp_interval, AppConfig};
use crate::store::{keys, KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Global settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub etherscan_api_key: String,
    pub bscscan_api_key: String,
    pub solscan_api_key: String,
    /// Empty disables alert dispatch
    pub webhook_url: String,
    pub default_message_template: String,
    pub poll_interval_secs: u64,
}

impl GlobalSettings {
    /// Defaults seeded from static configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            etherscan_api_key: config.explorers.etherscan.api_key.clone(),
            bscscan_api_key: config.explorers.bscscan.api_key.clone(),
            solscan_api_key: config.explorers.solscan.api_key.clone(),
            webhook_url: config.notifications.webhook_url.clone(),
            default_message_template: config.notifications.default_message_template.clone(),
            poll_interval_secs: clamp_interval(config.polling.interval_secs),
        }
    }

    fn normalized(mut self) -> Self {
        self.poll_interval_secs = clamp_interval(self.poll_interval_secs);
        self.webhook_url = self.webhook_url.trim().to_string();
        self
    }
}

/// Overlay the top-level fields of `overlay` onto `base`
fn merge(base: &mut Value, overlay: Value) {
    if let (Value::Object(base), Value::Object(overlay)) = (base, overlay) {
        for (key, value) in overlay {
            if !value.is_null() {
                base.insert(key, value);
            }
        }
    }
}

pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    defaults: GlobalSettings,
    interval_tx: watch::Sender<u64>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, defaults: GlobalSettings) -> Self {
        let defaults = defaults.normalized();
        let (interval_tx, _) = watch::channel(defaults.poll_interval_secs);
        Self {
            kv,
            defaults,
            interval_tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Current settings with defaults backfilled
    pub async fn get(&self) -> Result<GlobalSettings, StoreError> {
        let mut doc = serde_json::to_value(&self.defaults)?;
        if let Some(stored) = self.kv.get(keys::SETTINGS).await? {
            merge(&mut doc, stored);
        }
        let settings: GlobalSettings = serde_json::from_value(doc)?;
        Ok(settings.normalized())
    }

    /// Apply a partial update and persist the whole document
    pub async fn update(&self, patch: Value) -> Result<GlobalSettings, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut doc = serde_json::to_value(self.get().await?)?;
        merge(&mut doc, patch);
        let settings: GlobalSettings = serde_json::from_value::<GlobalSettings>(doc)?.normalized();

        self.kv.set_json(keys::SETTINGS, &settings).await?;
        self.publish_interval(settings.poll_interval_secs);

        tracing::info!(interval_secs = settings.poll_interval_secs, "Settings updated");
        Ok(settings)
    }

    /// Receiver notified whenever the poll interval changes
    pub fn subscribe_interval(&self) -> watch::Receiver<u64> {
        self.interval_tx.subscribe()
    }

    /// Publish the interval from the stored document, e.g. after startup
    pub async fn sync_interval(&self) -> Result<u64, StoreError> {
        let interval = self.get().await?.poll_interval_secs;
        self.publish_interval(interval);
        Ok(interval)
    }

    fn publish_interval(&self, secs: u64) {
        self.interval_tx.send_if_modified(|current| {
            if *current == secs {
                false
            } else {
                *current = secs;
                true
            }
        });
    }
}
