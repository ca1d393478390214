//! Prometheus metrics for Wallet Watch
//!
//! Exposes metrics endpoint for monitoring:
//! - Poll cycles by outcome
//! - Explorer errors by service
//! - Detected transactions by chain
//! - Alert deliveries by result
//! - Tracked wallet gauge and poll duration histogram

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{
    core::Collector, Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics state
pub struct MetricsState {
    /// Prometheus registry
    registry: Registry,
    /// Poll cycles by outcome (completed, skipped, abandoned)
    pub poll_cycles: IntCounterVec,
    /// Explorer failures by service
    pub explorer_errors: IntCounterVec,
    /// New transactions logged, by chain
    pub transactions_detected: IntCounterVec,
    /// Alert dispatch results (sent, skipped, failed)
    pub alerts: IntCounterVec,
    /// Number of tracked wallets seen by the last cycle
    pub tracked_wallets: IntGauge,
    /// Poll cycle duration in seconds
    pub poll_duration: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> prometheus::Result<C> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let poll_cycles = register(
            &registry,
            IntCounterVec::new(
                Opts::new("wallet_watch_poll_cycles_total", "Poll cycles by outcome"),
                &["outcome"],
            )?,
        )?;

        let explorer_errors = register(
            &registry,
            IntCounterVec::new(
                Opts::new("wallet_watch_explorer_errors_total", "Explorer request failures by service"),
                &["service"],
            )?,
        )?;

        let transactions_detected = register(
            &registry,
            IntCounterVec::new(
                Opts::new("wallet_watch_transactions_detected_total", "New transactions logged by chain"),
                &["chain"],
            )?,
        )?;

        let alerts = register(
            &registry,
            IntCounterVec::new(
                Opts::new("wallet_watch_alerts_total", "Alert dispatch results"),
                &["result"],
            )?,
        )?;

        let tracked_wallets = register(
            &registry,
            IntGauge::with_opts(Opts::new("wallet_watch_tracked_wallets", "Number of tracked wallets"))?,
        )?;

        let poll_duration = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new("wallet_watch_poll_duration_seconds", "Poll cycle duration in seconds")
                    .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            )?,
        )?;

        Ok(Self {
            registry,
            poll_cycles,
            explorer_errors,
            transactions_detected,
            alerts,
            tracked_wallets,
            poll_duration,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the text exposition format
    pub fn render(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    match state.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; version=0.0.4")],
                Vec::new(),
            )
        }
    }
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
