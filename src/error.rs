//! Error types for Wallet Watch

use crate::store::StoreError;
use crate::wallets::WalletError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Store(e) => AppError::Store(e),
            WalletError::Duplicate(key) => AppError::Conflict(format!("Wallet already tracked: {}", key)),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Error response structure for API
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, status, reason) = match &self {
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error", "storage_error"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "rejected", "validation_failed"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "rejected", "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "rejected", "already_exists"),
        };

        let details = match &self {
            AppError::Store(e) => e.to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => msg.clone(),
        };

        let error_response = ErrorResponse {
            status,
            reason: reason.to_string(),
            details: Some(details),
        };

        if status_code.is_server_error() {
            tracing::error!(error_type = %self, status_code = %status_code, "Request error");
        } else {
            tracing::debug!(error_type = %self, status_code = %status_code, "Request rejected");
        }

        (status_code, Json(json!(error_response))).into_response()
    }
}
