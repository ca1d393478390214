//! API Integration Tests
//!
//! Tests REST API endpoints for:
//! - Health check and metrics
//! - Wallet management
//! - Transaction log
//! - Settings
//! - Manual poll and status

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use wallet_watch::handlers;
use wallet_watch::models::{Chain, TxCategory, WalletMeta};

use crate::support::{harness, record, registry_for, FakeExplorer, Harness, EVM_ADDRESS};

fn app(h: &Harness) -> Router {
    handlers::router(h.app_state())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn empty_harness() -> Harness {
    harness(registry_for(Chain::Eth, FakeExplorer::new()))
}

// =============================================================================
// HEALTH CHECK TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let h = empty_harness();
    let (status, json) = call(&app(&h), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"]["status"], "healthy");
    assert!(json["uptime_seconds"].is_number());
    assert!(json["last_poll_unix"].is_null());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let h = empty_harness();
    let response = app(&h)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("wallet_watch_tracked_wallets"));
}

// =============================================================================
// WALLET TESTS
// =============================================================================

#[tokio::test]
async fn test_wallet_lifecycle() {
    let h = empty_harness();
    let app = app(&h);

    let (status, created) = call(
        &app,
        "POST",
        "/api/v1/wallets",
        Some(json!({ "chain": "eth", "address": EVM_ADDRESS, "label": "Hot" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["chain"], "eth");
    assert_eq!(created["address"], EVM_ADDRESS);
    assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));

    let (status, list) = call(&app, "GET", "/api/v1/wallets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["wallets"][0]["label"], "Hot");

    let uri = format!("/api/v1/wallets/eth/{}", EVM_ADDRESS);
    let (status, updated) = call(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "label": "Cold", "message_template": "{label}: {hash}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["label"], "Cold");
    assert_eq!(updated["message_template"], "{label}: {hash}");

    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "not_found");
}

#[tokio::test]
async fn test_duplicate_wallet_conflicts() {
    let h = empty_harness();
    let app = app(&h);
    let body = json!({ "chain": "bsc", "address": EVM_ADDRESS });

    let (status, _) = call(&app, "POST", "/api/v1/wallets", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = call(&app, "POST", "/api/v1/wallets", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["reason"], "already_exists");
}

#[tokio::test]
async fn test_invalid_wallet_is_rejected() {
    let h = empty_harness();
    let app = app(&h);

    let (status, json) = call(
        &app,
        "POST",
        "/api/v1/wallets",
        Some(json!({ "chain": "eth", "address": "not-an-address" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "validation_failed");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/wallets",
        Some(json!({ "chain": "btc", "address": EVM_ADDRESS })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "PATCH", "/api/v1/wallets/doge/abc", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_wallet_is_not_found() {
    let h = empty_harness();
    let uri = format!("/api/v1/wallets/eth/{}", EVM_ADDRESS);
    let (status, _) = call(&app(&h), "PATCH", &uri, Some(json!({ "label": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// POLL AND LOG TESTS
// =============================================================================

#[tokio::test]
async fn test_manual_poll_fills_log() {
    let explorer = FakeExplorer::new();
    explorer.set_records(
        TxCategory::Native,
        vec![record("0x02", 12, EVM_ADDRESS), record("0x01", 11, EVM_ADDRESS)],
    );
    let h = harness(registry_for(Chain::Eth, explorer));
    h.track("eth", EVM_ADDRESS, "Hot").await;
    h.wallets
        .set_meta(
            EVM_ADDRESS,
            Chain::Eth,
            WalletMeta {
                last_native_block: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let app = app(&h);

    let (status, json) = call(&app, "POST", "/api/v1/poll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "completed");
    assert_eq!(json["report"]["new_transactions"], 2);
    assert_eq!(json["report"]["wallets_checked"], 1);

    let (status, json) = call(&app, "GET", "/api/v1/logs?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["entries"][0]["hash"], "0x02");
    assert_eq!(json["entries"][0]["direction"], "in");
    assert_eq!(json["entries"][0]["chain"], "eth");

    let (status, json) = call(&app, "GET", "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], false);
    assert_eq!(json["tracked_wallets"], 1);
    assert_eq!(json["log_entries"], 2);
    let last = json["last_run_unix"].as_i64().unwrap();
    assert_eq!(json["next_run_unix"].as_i64().unwrap(), last + 300);

    let (status, _) = call(&app, "DELETE", "/api/v1/logs", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = call(&app, "GET", "/api/v1/logs", None).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_status_reports_service_errors() {
    let explorer = FakeExplorer::new();
    explorer.fail_with("NOTOK: Invalid API Key");
    let h = harness(registry_for(Chain::Eth, explorer));
    h.track("eth", EVM_ADDRESS, "Hot").await;
    let app = app(&h);

    let (_, json) = call(&app, "POST", "/api/v1/poll", None).await;
    assert_eq!(json["report"]["wallets_failed"], 1);

    let (_, json) = call(&app, "GET", "/api/v1/status", None).await;
    let message = json["service_errors"]["etherscan"]["message"].as_str().unwrap();
    assert!(message.contains("Invalid API Key"));
}

// =============================================================================
// SETTINGS TESTS
// =============================================================================

#[tokio::test]
async fn test_settings_read_and_partial_update() {
    let h = empty_harness();
    let app = app(&h);

    let (status, json) = call(&app, "GET", "/api/v1/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["poll_interval_secs"], 300);
    assert_eq!(json["etherscan_api_key"], "TESTKEY");

    let (status, json) = call(
        &app,
        "PUT",
        "/api/v1/settings",
        Some(json!({ "poll_interval_secs": 5, "solscan_api_key": "SOL" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["poll_interval_secs"], 60);
    assert_eq!(json["solscan_api_key"], "SOL");
    assert_eq!(json["etherscan_api_key"], "TESTKEY");

    let (_, json) = call(&app, "GET", "/api/v1/settings", None).await;
    assert_eq!(json["poll_interval_secs"], 60);
}

#[tokio::test]
async fn test_settings_validation() {
    let h = empty_harness();
    let app = app(&h);

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/settings",
        Some(json!({ "webhook_url": "ftp://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/settings",
        Some(json!({ "poll_interval_secs": "soon" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "PUT", "/api/v1/settings", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // an empty URL disables alerts and is allowed
    let (status, json) = call(
        &app,
        "PUT",
        "/api/v1/settings",
        Some(json!({ "webhook_url": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["webhook_url"], "");
}
