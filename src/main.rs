//! Wallet Watch - multi-chain wallet activity monitor
//!
//! This is the main entry point for the service.
//! It wires storage, the poll engine and its scheduler, and serves the
//! admin API.

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_watch::config::AppConfig;
use wallet_watch::db;
use wallet_watch::engine::{PollEngine, PollEngineConfig, PollLock, PollScheduler};
use wallet_watch::explorer::ExplorerRegistry;
use wallet_watch::handlers::{self, AppState};
use wallet_watch::metrics::MetricsState;
use wallet_watch::notifications::{AlertDispatcher, WebhookNotifier};
use wallet_watch::settings::{GlobalSettings, SettingsStore};
use wallet_watch::store::{KeyValueStore, SqliteKvStore};
use wallet_watch::tx_log::TransactionLog;
use wallet_watch::wallets::WalletStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    tracing::info!("Starting Wallet Watch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // Initialize database
    let db_pool = db::init_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;
    tracing::info!("Database initialized");

    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(db_pool.clone()));

    let wallets = Arc::new(WalletStore::new(kv.clone()));
    let tx_log = Arc::new(TransactionLog::new(kv.clone(), config.polling.log_capacity));
    let settings = Arc::new(SettingsStore::new(
        kv.clone(),
        GlobalSettings::from_config(&config),
    ));
    let interval_secs = settings.sync_interval().await?;

    let metrics = Arc::new(MetricsState::new()?);

    let explorers = ExplorerRegistry::from_config(&config.explorers)?;
    let notifier = WebhookNotifier::new(Duration::from_secs(config.notifications.timeout_secs))?;
    let alerts = Arc::new(AlertDispatcher::new(Arc::new(notifier)));

    let engine = Arc::new(PollEngine::new(
        wallets.clone(),
        tx_log.clone(),
        settings.clone(),
        explorers,
        alerts,
        kv.clone(),
        PollLock::new(Duration::from_secs(config.polling.lock_ttl_secs)),
        metrics.clone(),
        PollEngineConfig {
            page_size: config.explorers.page_size,
            baseline_new_wallets: config.polling.baseline_new_wallets,
        },
    ));

    let cancel_token = CancellationToken::new();

    let scheduler_handle = if config.polling.enabled {
        tracing::info!(interval_secs, "Poll scheduler enabled");
        Some(PollScheduler::spawn(
            engine.clone(),
            settings.subscribe_interval(),
            cancel_token.clone(),
        ))
    } else {
        tracing::info!("Poll scheduler disabled");
        None
    };

    let app_state = Arc::new(AppState {
        wallets,
        tx_log,
        settings,
        engine,
        metrics,
        started_at: Utc::now(),
        lazy_poll: config.polling.lazy_trigger,
    });

    let app = handlers::router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    cancel_token.cancel();
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Poll scheduler task ended abnormally");
        }
    }

    db_pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_watch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
