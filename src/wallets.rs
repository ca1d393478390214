//! Tracked wallets and their per-wallet dedup metadata
//!
//! Wallets and metadata are separate documents: editing a wallet never
//! touches its watermarks, and removing a wallet purges its metadata so a
//! re-added wallet starts fresh.

use crate::models::{meta_key, Chain, NewWallet, Wallet, WalletMeta, WalletPatch};
use crate::store::{keys, KeyValueStore, StoreError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Wallet store errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Address is required")]
    EmptyAddress,

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Invalid {chain} address: {address}")]
    InvalidAddress { chain: Chain, address: String },

    #[error("Wallet already tracked: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistent wallet registry
pub struct WalletStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl WalletStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self
            .kv
            .get_json::<Vec<Wallet>>(keys::WALLETS)
            .await?
            .unwrap_or_default())
    }

    async fn load_meta(&self) -> Result<HashMap<String, WalletMeta>, StoreError> {
        Ok(self
            .kv
            .get_json::<HashMap<String, WalletMeta>>(keys::WALLET_META)
            .await?
            .unwrap_or_default())
    }

    /// All tracked wallets in storage order
    pub async fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        self.load().await
    }

    pub async fn get(&self, address: &str, chain: Chain) -> Result<Option<Wallet>, StoreError> {
        let address = chain.normalize_address(address);
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|w| w.chain == chain && w.address == address))
    }

    /// Start tracking a wallet
    pub async fn add(&self, new: NewWallet) -> Result<Wallet, WalletError> {
        let chain: Chain = new
            .chain
            .parse()
            .map_err(|_| WalletError::UnsupportedChain(new.chain.trim().to_string()))?;

        let address = chain.normalize_address(&new.address);
        if address.is_empty() {
            return Err(WalletError::EmptyAddress);
        }
        if !chain.is_valid_address(&address) {
            return Err(WalletError::InvalidAddress { chain, address });
        }

        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load().await?;
        if wallets.iter().any(|w| w.chain == chain && w.address == address) {
            return Err(WalletError::Duplicate(meta_key(&address, chain)));
        }

        let wallet = Wallet {
            id: new
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            chain,
            address,
            label: new.label.trim().to_string(),
            message_template: new.message_template.unwrap_or_default(),
            created_at: Utc::now(),
        };

        // A stale metadata record must not survive into the new wallet's life
        let mut meta = self.load_meta().await?;
        if meta.remove(&wallet.key()).is_some() {
            self.kv.set_json(keys::WALLET_META, &meta).await?;
        }

        wallets.push(wallet.clone());
        self.kv.set_json(keys::WALLETS, &wallets).await?;

        tracing::info!(wallet = %wallet.address, chain = %wallet.chain, "Wallet added");
        Ok(wallet)
    }

    /// Stop tracking a wallet; returns whether one was removed
    pub async fn remove(&self, address: &str, chain: Chain) -> Result<bool, StoreError> {
        let address = chain.normalize_address(address);

        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load().await?;
        let before = wallets.len();
        wallets.retain(|w| !(w.chain == chain && w.address == address));
        let removed = wallets.len() != before;

        if removed {
            self.kv.set_json(keys::WALLETS, &wallets).await?;
        }

        let mut meta = self.load_meta().await?;
        if meta.remove(&meta_key(&address, chain)).is_some() {
            self.kv.set_json(keys::WALLET_META, &meta).await?;
        }

        if removed {
            tracing::info!(wallet = %address, chain = %chain, "Wallet removed");
        }
        Ok(removed)
    }

    /// Edit label or template; returns the updated wallet if it exists
    pub async fn update(
        &self,
        address: &str,
        chain: Chain,
        patch: WalletPatch,
    ) -> Result<Option<Wallet>, StoreError> {
        let address = chain.normalize_address(address);

        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load().await?;
        let Some(wallet) = wallets
            .iter_mut()
            .find(|w| w.chain == chain && w.address == address)
        else {
            return Ok(None);
        };

        if let Some(label) = patch.label {
            wallet.label = label.trim().to_string();
        }
        if let Some(template) = patch.message_template {
            wallet.message_template = template;
        }
        let updated = wallet.clone();

        self.kv.set_json(keys::WALLETS, &wallets).await?;
        Ok(Some(updated))
    }

    /// Dedup metadata for a wallet, if any has been committed
    pub async fn get_meta(&self, address: &str, chain: Chain) -> Result<Option<WalletMeta>, StoreError> {
        Ok(self.load_meta().await?.remove(&meta_key(address, chain)))
    }

    /// Store dedup metadata for a tracked wallet.
    ///
    /// Returns `false` without writing when the wallet is no longer tracked,
    /// so a cycle racing a removal cannot leave orphaned metadata behind.
    pub async fn set_meta(&self, address: &str, chain: Chain, mut meta: WalletMeta) -> Result<bool, StoreError> {
        let key = meta_key(address, chain);
        meta.updated_at = Some(Utc::now());

        let _guard = self.write_lock.lock().await;
        if !self.load().await?.iter().any(|w| w.key() == key) {
            tracing::debug!(wallet = %key, "Wallet no longer tracked, dropping metadata");
            return Ok(false);
        }

        let mut all = self.load_meta().await?;
        all.insert(key, meta);
        self.kv.set_json(keys::WALLET_META, &all).await?;
        Ok(true)
    }

    pub async fn remove_meta(&self, address: &str, chain: Chain) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.load_meta().await?;
        if all.remove(&meta_key(address, chain)).is_some() {
            self.kv.set_json(keys::WALLET_META, &all).await?;
        }
        Ok(())
    }
}
