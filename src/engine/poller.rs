//! Poll cycle orchestration
//!
//! One cycle walks every tracked wallet in storage order, fetches recent
//! transactions per category, keeps the ones the wallet's metadata has not
//! seen, and commits them: log append first, then the metadata write, then
//! best-effort alerts. A wallet's watermark never advances before its log
//! entries are durable.
//!
//! The cycle renews its lease before each wallet and before each commit. If
//! another cycle took the lease over in between, nothing more is written and
//! the cycle is abandoned.

use super::lock::{PollLeaseGuard, PollLock};
use crate::explorer::{
    Explorer, ExplorerError, ExplorerRegistry, ExplorerService, FetchOrder, FetchRequest,
};
use crate::metrics::MetricsState;
use crate::models::{TransactionLogEntry, TransactionRecord, Wallet};
use crate::notifications::{compose_message, AlertDispatcher, DispatchResult};
use crate::settings::{GlobalSettings, SettingsStore};
use crate::store::{keys, KeyValueStore, StoreError};
use crate::tx_log::TransactionLog;
use crate::utils::unix_now;
use crate::wallets::WalletStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Engine tuning taken from static configuration
#[derive(Debug, Clone)]
pub struct PollEngineConfig {
    /// Transactions requested per explorer call
    pub page_size: u32,
    /// Seed metadata for wallets without any, without logging or alerting
    pub baseline_new_wallets: bool,
}

impl Default for PollEngineConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            baseline_new_wallets: true,
        }
    }
}

/// Last failure reported by an explorer service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    pub message: String,
    pub recorded_at: i64,
}

/// Persisted bookkeeping across cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollRunState {
    #[serde(default)]
    pub last_run_unix: Option<i64>,
    #[serde(default)]
    pub service_errors: BTreeMap<ExplorerService, ServiceError>,
}

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Scheduled,
    Manual,
    Lazy,
}

impl fmt::Display for PollTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollTrigger::Scheduled => write!(f, "scheduled"),
            PollTrigger::Manual => write!(f, "manual"),
            PollTrigger::Lazy => write!(f, "lazy"),
        }
    }
}

/// Aggregate counts for one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub wallets_checked: usize,
    pub wallets_failed: usize,
    pub wallets_skipped: usize,
    pub new_transactions: usize,
    pub alerts_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another cycle held the lease
    Skipped,
    Completed(PollReport),
    /// The lease was taken over mid-cycle; counts cover work committed before that
    Abandoned(PollReport),
}

enum WalletOutcome {
    Checked,
    Skipped,
    /// Removed while its transactions were being fetched
    Removed,
}

#[derive(Error, Debug)]
enum WalletPollError {
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("poll lease lost")]
    LeaseLost,
}

/// API key for a service from the current settings
pub fn api_key_for(service: ExplorerService, settings: &GlobalSettings) -> &str {
    match service {
        ExplorerService::Etherscan => &settings.etherscan_api_key,
        ExplorerService::Bscscan => &settings.bscscan_api_key,
        ExplorerService::Solscan => &settings.solscan_api_key,
    }
}

pub struct PollEngine {
    wallets: Arc<WalletStore>,
    tx_log: Arc<TransactionLog>,
    settings: Arc<SettingsStore>,
    explorers: ExplorerRegistry,
    alerts: Arc<AlertDispatcher>,
    kv: Arc<dyn KeyValueStore>,
    lock: PollLock,
    metrics: Arc<MetricsState>,
    config: PollEngineConfig,
}

impl PollEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wallets: Arc<WalletStore>,
        tx_log: Arc<TransactionLog>,
        settings: Arc<SettingsStore>,
        explorers: ExplorerRegistry,
        alerts: Arc<AlertDispatcher>,
        kv: Arc<dyn KeyValueStore>,
        lock: PollLock,
        metrics: Arc<MetricsState>,
        config: PollEngineConfig,
    ) -> Self {
        Self {
            wallets,
            tx_log,
            settings,
            explorers,
            alerts,
            kv,
            lock,
            metrics,
            config,
        }
    }

    pub fn lock(&self) -> &PollLock {
        &self.lock
    }

    /// Persisted run state (last run time, service error slots)
    pub async fn run_state(&self) -> Result<PollRunState, StoreError> {
        Ok(self
            .kv
            .get_json::<PollRunState>(keys::POLL_STATE)
            .await?
            .unwrap_or_default())
    }

    /// Run a cycle only when the configured interval has elapsed
    pub async fn poll_if_due(&self, trigger: PollTrigger) -> Result<Option<PollOutcome>, StoreError> {
        let interval = self.settings.get().await?.poll_interval_secs as i64;
        let last_run = self.run_state().await?.last_run_unix;

        let due = match last_run {
            Some(last) => unix_now() - last >= interval,
            None => true,
        };
        if !due {
            return Ok(None);
        }

        self.poll(trigger).await.map(Some)
    }

    /// Run one poll cycle. Returns `Skipped` when another cycle holds the lease.
    #[tracing::instrument(skip(self))]
    pub async fn poll(&self, trigger: PollTrigger) -> Result<PollOutcome, StoreError> {
        let Some(lease) = self.lock.try_acquire() else {
            tracing::debug!("Poll cycle already running, skipping");
            self.metrics.poll_cycles.with_label_values(&["skipped"]).inc();
            return Ok(PollOutcome::Skipped);
        };

        let started = Instant::now();
        let settings = self.settings.get().await?;
        let wallets = self.wallets.list().await?;
        let mut state = self.run_state().await?;
        let mut report = PollReport::default();

        self.metrics.tracked_wallets.set(wallets.len() as i64);

        for wallet in &wallets {
            if !lease.renew() {
                return Ok(self.abandon(report));
            }

            match self.poll_wallet(wallet, &lease, &settings, &mut state, &mut report).await {
                Ok(WalletOutcome::Checked) => report.wallets_checked += 1,
                Ok(WalletOutcome::Skipped) | Ok(WalletOutcome::Removed) => report.wallets_skipped += 1,
                Err(WalletPollError::LeaseLost) => return Ok(self.abandon(report)),
                Err(e) => {
                    report.wallets_failed += 1;
                    tracing::warn!(
                        wallet = %wallet.address,
                        chain = %wallet.chain,
                        error = %e,
                        "Wallet poll failed, skipping"
                    );
                }
            }
        }

        let in_use: HashSet<ExplorerService> = wallets
            .iter()
            .map(|w| ExplorerService::for_chain(w.chain))
            .collect();
        state.service_errors.retain(|service, _| in_use.contains(service));
        state.last_run_unix = Some(unix_now());
        if !lease.renew() {
            return Ok(self.abandon(report));
        }
        self.kv.set_json(keys::POLL_STATE, &state).await?;

        self.metrics.poll_cycles.with_label_values(&["completed"]).inc();
        self.metrics.poll_duration.observe(started.elapsed().as_secs_f64());

        tracing::info!(
            wallets_checked = report.wallets_checked,
            wallets_failed = report.wallets_failed,
            wallets_skipped = report.wallets_skipped,
            new_transactions = report.new_transactions,
            alerts_sent = report.alerts_sent,
            "Poll cycle completed"
        );

        Ok(PollOutcome::Completed(report))
    }

    fn abandon(&self, report: PollReport) -> PollOutcome {
        tracing::warn!(
            new_transactions = report.new_transactions,
            "Poll lease taken over by another cycle, abandoning"
        );
        self.metrics.poll_cycles.with_label_values(&["abandoned"]).inc();
        PollOutcome::Abandoned(report)
    }

    async fn poll_wallet(
        &self,
        wallet: &Wallet,
        lease: &PollLeaseGuard<'_>,
        settings: &GlobalSettings,
        state: &mut PollRunState,
        report: &mut PollReport,
    ) -> Result<WalletOutcome, WalletPollError> {
        let chain = wallet.chain;
        let service = ExplorerService::for_chain(chain);
        let api_key = api_key_for(service, settings).trim();

        if service.requires_api_key() && api_key.is_empty() {
            tracing::debug!(wallet = %wallet.address, service = %service, "No API key, skipping wallet");
            return Ok(WalletOutcome::Skipped);
        }

        let Some(explorer) = self.explorers.for_chain(chain) else {
            tracing::debug!(chain = %chain, "No explorer registered, skipping wallet");
            return Ok(WalletOutcome::Skipped);
        };

        let existing = self.wallets.get_meta(&wallet.address, chain).await?;
        let baseline = existing.is_none() && self.config.baseline_new_wallets;
        let mut meta = existing.unwrap_or_default();
        let order = if baseline {
            FetchOrder::NewestFirst
        } else {
            FetchOrder::Ascending
        };

        for &category in chain.categories() {
            let request = FetchRequest {
                chain,
                address: wallet.address.clone(),
                api_key: api_key.to_string(),
                category,
                start_block: meta.watermark(category),
                page_size: self.config.page_size,
                order,
            };

            let records = match self.fetch(explorer.as_ref(), &request).await {
                Ok(records) => {
                    state.service_errors.remove(&service);
                    records
                }
                Err(ExplorerError::MissingApiKey(_)) => {
                    tracing::debug!(wallet = %wallet.address, service = %service, "No API key, skipping wallet");
                    return Ok(WalletOutcome::Skipped);
                }
                Err(e) => {
                    self.metrics.explorer_errors.with_label_values(&[service.as_str()]).inc();
                    state.service_errors.insert(
                        service,
                        ServiceError {
                            message: e.to_string(),
                            recorded_at: unix_now(),
                        },
                    );
                    return Err(e.into());
                }
            };

            if order == FetchOrder::Ascending && records.len() >= self.config.page_size as usize {
                tracing::debug!(
                    wallet = %wallet.address,
                    category = %category,
                    "Full page fetched, remaining transactions follow next cycle"
                );
            }

            let mut accepted: Vec<TransactionLogEntry> = Vec::new();
            let mut changed = false;

            for mut record in records {
                record.hash = chain.normalize_hash(&record.hash);
                if !meta.admit(category, &record.hash, record.block_number) {
                    continue;
                }
                changed = true;
                if baseline {
                    continue;
                }

                let mut entry = TransactionLogEntry::from_record(wallet, category, &record);
                entry.message = compose_message(wallet, &entry, settings);
                accepted.push(entry);
            }

            if baseline {
                // metadata for a baseline is written once every category has been seen
                continue;
            }

            if !changed {
                continue;
            }

            if !lease.renew() {
                return Err(WalletPollError::LeaseLost);
            }
            if self.wallets.get(&wallet.address, chain).await?.is_none() {
                tracing::debug!(wallet = %wallet.address, chain = %chain, "Wallet removed during poll");
                return Ok(WalletOutcome::Removed);
            }

            if !accepted.is_empty() {
                self.tx_log.append_batch(accepted.clone()).await?;
            }
            if !self.wallets.set_meta(&wallet.address, chain, meta.clone()).await? {
                return Ok(WalletOutcome::Removed);
            }

            if !accepted.is_empty() {
                report.new_transactions += accepted.len();
                let chain_label = chain.to_string();
                self.metrics
                    .transactions_detected
                    .with_label_values(&[chain_label.as_str()])
                    .inc_by(accepted.len() as u64);
                tracing::info!(
                    wallet = %wallet.address,
                    chain = %chain,
                    category = %category,
                    count = accepted.len(),
                    "New transactions detected"
                );
                report.alerts_sent += self.send_alerts(wallet, &accepted, settings).await;
            }
        }

        if baseline {
            if !lease.renew() {
                return Err(WalletPollError::LeaseLost);
            }
            if !self.wallets.set_meta(&wallet.address, chain, meta).await? {
                return Ok(WalletOutcome::Removed);
            }
            tracing::info!(wallet = %wallet.address, chain = %chain, "Baseline recorded for new wallet");
        }

        Ok(WalletOutcome::Checked)
    }

    async fn fetch(
        &self,
        explorer: &dyn Explorer,
        request: &FetchRequest,
    ) -> Result<Vec<TransactionRecord>, ExplorerError> {
        let mut records = explorer.fetch_latest(request).await?;
        records.sort_by_key(|r| r.block_number);
        Ok(records)
    }

    /// Dispatch alerts in log order (oldest first); returns how many were delivered
    async fn send_alerts(
        &self,
        wallet: &Wallet,
        entries: &[TransactionLogEntry],
        settings: &GlobalSettings,
    ) -> usize {
        let mut sent = 0;
        for entry in entries {
            let result = self.alerts.dispatch(wallet, entry, settings).await;
            self.metrics.alerts.with_label_values(&[result.as_str()]).inc();
            if result == DispatchResult::Sent {
                sent += 1;
            }
        }
        sent
    }
}
