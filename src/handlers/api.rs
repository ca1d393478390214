//! REST API handlers for Wallet Watch
//!
//! Provides endpoints for:
//! - Wallets: list, add, edit and remove tracked wallets
//! - Logs: read and clear the transaction log
//! - Settings: view and update global settings
//! - Polling: manual trigger and run status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AppState;
use crate::engine::{PollOutcome, PollReport, PollTrigger, ServiceError};
use crate::error::AppError;
use crate::explorer::ExplorerService;
use crate::models::{Chain, NewWallet, TransactionLogEntry, Wallet, WalletPatch};
use crate::settings::GlobalSettings;
use crate::store::StoreError;

fn parse_chain(raw: &str) -> Result<Chain, AppError> {
    raw.parse().map_err(AppError::Validation)
}

// =============================================================================
// WALLETS API
// =============================================================================

/// Response for wallets list
#[derive(Debug, Serialize)]
pub struct WalletsResponse {
    pub wallets: Vec<Wallet>,
    pub total: usize,
}

/// List tracked wallets
///
/// GET /api/v1/wallets
pub async fn list_wallets(State(state): State<Arc<AppState>>) -> Result<Json<WalletsResponse>, AppError> {
    let wallets = state.wallets.list().await?;
    let total = wallets.len();
    Ok(Json(WalletsResponse { wallets, total }))
}

/// Start tracking a wallet
///
/// POST /api/v1/wallets
pub async fn add_wallet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewWallet>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = state.wallets.add(request).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

/// Edit a wallet's label or message template
///
/// PATCH /api/v1/wallets/:chain/:address
pub async fn update_wallet(
    State(state): State<Arc<AppState>>,
    Path((chain, address)): Path<(String, String)>,
    Json(patch): Json<WalletPatch>,
) -> Result<Json<Wallet>, AppError> {
    let chain = parse_chain(&chain)?;
    match state.wallets.update(&address, chain, patch).await? {
        Some(wallet) => Ok(Json(wallet)),
        None => Err(AppError::NotFound(format!("Wallet not found: {}:{}", chain, address))),
    }
}

/// Stop tracking a wallet and drop its metadata
///
/// DELETE /api/v1/wallets/:chain/:address
pub async fn remove_wallet(
    State(state): State<Arc<AppState>>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let chain = parse_chain(&chain)?;
    if state.wallets.remove(&address, chain).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Wallet not found: {}:{}", chain, address)))
    }
}

// =============================================================================
// TRANSACTION LOG API
// =============================================================================

/// Query parameters for the log
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub entries: Vec<TransactionLogEntry>,
    pub total: usize,
}

/// Newest entries first
///
/// GET /api/v1/logs?limit=N
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, AppError> {
    let entries = state.tx_log.list(params.limit).await?;
    let total = entries.len();
    Ok(Json(LogsResponse { entries, total }))
}

/// DELETE /api/v1/logs
pub async fn clear_logs(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.tx_log.clear().await?;
    tracing::info!("Transaction log cleared");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SETTINGS API
// =============================================================================

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<GlobalSettings>, AppError> {
    Ok(Json(state.settings.get().await?))
}

/// Partial update; omitted fields keep their values
///
/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<Value>,
) -> Result<Json<GlobalSettings>, AppError> {
    if !patch.is_object() {
        return Err(AppError::Validation("settings must be a JSON object".to_string()));
    }

    if let Some(url) = patch.get("webhook_url").and_then(Value::as_str) {
        let url = url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AppError::Validation("webhook_url must be an http(s) URL".to_string()));
        }
    }

    match state.settings.update(patch).await {
        Ok(settings) => Ok(Json(settings)),
        Err(StoreError::Serialization(e)) => Err(AppError::Validation(e.to_string())),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// POLLING API
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PollResponse {
    /// "completed", "skipped" or "abandoned"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PollReport>,
}

/// Run a poll cycle now; respects the poll lock
///
/// POST /api/v1/poll
pub async fn trigger_poll(State(state): State<Arc<AppState>>) -> Result<Json<PollResponse>, AppError> {
    let response = match state.engine.poll(PollTrigger::Manual).await? {
        PollOutcome::Completed(report) => PollResponse {
            status: "completed",
            report: Some(report),
        },
        PollOutcome::Skipped => PollResponse {
            status: "skipped",
            report: None,
        },
        PollOutcome::Abandoned(report) => PollResponse {
            status: "abandoned",
            report: Some(report),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub last_run_unix: Option<i64>,
    pub next_run_unix: Option<i64>,
    pub poll_interval_secs: u64,
    pub tracked_wallets: usize,
    pub log_entries: usize,
    pub service_errors: BTreeMap<ExplorerService, ServiceError>,
}

/// GET /api/v1/status
pub async fn poll_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let run_state = state.engine.run_state().await?;
    let settings = state.settings.get().await?;

    Ok(Json(StatusResponse {
        running: state.engine.lock().is_held(),
        last_run_unix: run_state.last_run_unix,
        next_run_unix: run_state
            .last_run_unix
            .map(|last| last + settings.poll_interval_secs as i64),
        poll_interval_secs: settings.poll_interval_secs,
        tracked_wallets: state.wallets.list().await?.len(),
        log_entries: state.tx_log.len().await?,
        service_errors: run_state.service_errors,
    }))
}
