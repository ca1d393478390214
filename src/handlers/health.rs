//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    /// Storage status
    pub storage: ComponentHealth,
    /// Unix time of the last completed poll cycle
    pub last_poll_unix: Option<i64>,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check handler
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let uptime = (Utc::now() - state.started_at).num_seconds();

    let (storage, last_poll_unix) = match state.engine.run_state().await {
        Ok(run_state) => (
            ComponentHealth {
                status: HealthStatus::Healthy,
                message: None,
            },
            run_state.last_run_unix,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Storage health check failed");
            (
                ComponentHealth {
                    status: HealthStatus::Unhealthy,
                    message: Some(e.to_string()),
                },
                None,
            )
        }
    };

    let status = storage.status;
    let status_code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            uptime_seconds: uptime,
            storage,
            last_poll_unix,
        }),
    )
}
