//! Database Integration Tests
//!
//! Tests the SQLite key/value store:
//! - Schema creation and WAL pool setup
//! - Upsert, read back and delete
//! - State surviving a pool reopen

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use wallet_watch::config::DatabaseConfig;
use wallet_watch::db::{init_pool, run_migrations, DbPool};
use wallet_watch::models::{Chain, NewWallet, TxCategory, WalletMeta};
use wallet_watch::store::{keys, KeyValueStore, SqliteKvStore};
use wallet_watch::wallets::WalletStore;

use crate::support::EVM_ADDRESS;

/// Create a temporary database for testing
async fn create_test_db(temp_dir: &TempDir) -> DbPool {
    let config = DatabaseConfig {
        path: temp_dir.path().join("nested").join("test.db"),
        max_connections: 5,
    };

    let pool = init_pool(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn test_set_get_delete() {
    let temp_dir = TempDir::new().unwrap();
    let kv = SqliteKvStore::new(create_test_db(&temp_dir).await);

    assert!(kv.get("missing").await.unwrap().is_none());

    kv.set("doc", json!({ "a": 1 })).await.unwrap();
    kv.set("doc", json!({ "a": 2, "b": [1, 2] })).await.unwrap();
    assert_eq!(kv.get("doc").await.unwrap(), Some(json!({ "a": 2, "b": [1, 2] })));

    kv.delete("doc").await.unwrap();
    assert!(kv.get("doc").await.unwrap().is_none());
    // deleting an absent key is fine
    kv.delete("doc").await.unwrap();
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let pool = create_test_db(&temp_dir).await;
    run_migrations(&pool).await.unwrap();

    let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_typed_documents() {
    let temp_dir = TempDir::new().unwrap();
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(create_test_db(&temp_dir).await));

    let mut meta = WalletMeta::default();
    meta.record(TxCategory::Native, "0xabc", 42);
    kv.set_json(keys::WALLET_META, &meta).await.unwrap();

    let loaded: WalletMeta = kv.get_json(keys::WALLET_META).await.unwrap().unwrap();
    assert_eq!(loaded, meta);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let pool = create_test_db(&temp_dir).await;
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(pool.clone()));
        let wallets = WalletStore::new(kv);
        wallets
            .add(NewWallet {
                id: Some("w1".to_string()),
                chain: "eth".to_string(),
                address: EVM_ADDRESS.to_string(),
                label: "Hot".to_string(),
                message_template: None,
            })
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = create_test_db(&temp_dir).await;
    let wallets = WalletStore::new(Arc::new(SqliteKvStore::new(pool)));
    let wallet = wallets.get(EVM_ADDRESS, Chain::Eth).await.unwrap().unwrap();
    assert_eq!(wallet.id, "w1");
    assert_eq!(wallet.label, "Hot");
}
