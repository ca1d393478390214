//! HTTP handlers for Wallet Watch

mod api;
mod health;

pub use api::*;
pub use health::*;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::PollEngine;
use crate::metrics::{metrics_router, MetricsState};
use crate::settings::SettingsStore;
use crate::tx_log::TransactionLog;
use crate::wallets::WalletStore;

/// Shared state for API handlers
pub struct AppState {
    pub wallets: Arc<WalletStore>,
    pub tx_log: Arc<TransactionLog>,
    pub settings: Arc<SettingsStore>,
    pub engine: Arc<PollEngine>,
    pub metrics: Arc<MetricsState>,
    /// Application start time
    pub started_at: DateTime<Utc>,
    /// Start a background cycle from API traffic when one is due
    pub lazy_poll: bool,
}

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/wallets", get(list_wallets).post(add_wallet))
        .route(
            "/wallets/:chain/:address",
            patch(update_wallet).delete(remove_wallet),
        )
        .route("/logs", get(list_logs).delete(clear_logs))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/poll", post(trigger_poll))
        .route("/status", get(poll_status))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::lazy_poll,
        ))
        .with_state(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    let metrics_routes = metrics_router().with_state(state.metrics.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
