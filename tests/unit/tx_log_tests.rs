//! Transaction log tests: ordering, capacity and clearing

use std::sync::Arc;
use wallet_watch::models::{Chain, Direction, TransactionLogEntry, TxCategory};
use wallet_watch::store::{KeyValueStore, MemoryKvStore};
use wallet_watch::tx_log::{TransactionLog, DEFAULT_LOG_CAPACITY};

fn entry(hash: &str, block: u64) -> TransactionLogEntry {
    TransactionLogEntry {
        id: format!("id-{}", hash),
        wallet_id: "w1".to_string(),
        label: "Hot".to_string(),
        address: "0x1111111111111111111111111111111111111111".to_string(),
        chain: Chain::Eth,
        category: TxCategory::Native,
        hash: hash.to_string(),
        direction: Direction::In,
        amount: "1".to_string(),
        token: "ETH".to_string(),
        from: "0x2222222222222222222222222222222222222222".to_string(),
        to: "0x1111111111111111111111111111111111111111".to_string(),
        block_number: block,
        timestamp: 1_700_000_000 + block as i64,
        explorer_url: String::new(),
        message: String::new(),
    }
}

fn log(capacity: usize) -> TransactionLog {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
    TransactionLog::new(kv, capacity)
}

fn hashes(entries: &[TransactionLogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.hash.as_str()).collect()
}

#[tokio::test]
async fn test_newest_first() {
    let log = log(DEFAULT_LOG_CAPACITY);
    log.append_batch(vec![entry("a", 1), entry("b", 2)]).await.unwrap();
    log.append(entry("c", 3)).await.unwrap();

    let entries = log.list(None).await.unwrap();
    assert_eq!(hashes(&entries), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_capacity_drops_oldest() {
    let log = log(3);
    log.append_batch(vec![entry("a", 1), entry("b", 2)]).await.unwrap();
    log.append_batch(vec![entry("c", 3), entry("d", 4)]).await.unwrap();

    let entries = log.list(None).await.unwrap();
    assert_eq!(hashes(&entries), vec!["d", "c", "b"]);
    assert_eq!(log.len().await.unwrap(), 3);
}

#[tokio::test]
async fn test_default_capacity_is_two_hundred() {
    let log = log(DEFAULT_LOG_CAPACITY);
    let batch: Vec<_> = (0..250).map(|i| entry(&format!("h{}", i), i)).collect();
    log.append_batch(batch).await.unwrap();

    let entries = log.list(None).await.unwrap();
    assert_eq!(entries.len(), 200);
    assert_eq!(entries[0].hash, "h249");
    assert_eq!(entries[199].hash, "h50");
}

#[tokio::test]
async fn test_limit_returns_newest() {
    let log = log(DEFAULT_LOG_CAPACITY);
    log.append_batch(vec![entry("a", 1), entry("b", 2), entry("c", 3)])
        .await
        .unwrap();

    let entries = log.list(Some(2)).await.unwrap();
    assert_eq!(hashes(&entries), vec!["c", "b"]);
    assert!(log.list(Some(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_empties_log() {
    let log = log(DEFAULT_LOG_CAPACITY);
    log.append(entry("a", 1)).await.unwrap();
    log.clear().await.unwrap();

    assert!(log.list(None).await.unwrap().is_empty());
    // clearing twice is harmless
    log.clear().await.unwrap();
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let log = log(DEFAULT_LOG_CAPACITY);
    log.append_batch(Vec::new()).await.unwrap();
    assert_eq!(log.len().await.unwrap(), 0);
}

#[test]
fn test_zero_capacity_is_raised_to_one() {
    assert_eq!(log(0).capacity(), 1);
}
