//! Solscan client
//!
//! Handles both the legacy public API (bare array of `txHash`/`lamport`
//! records) and the newer `{ success, data: [...] }` envelope.

use super::{
    extract_transactions, read_json, text_field, u64_field, Explorer, ExplorerError, FetchRequest,
    RateLimiter,
};
use crate::config::ExplorerServiceConfig;
use crate::models::{Chain, TransactionRecord, TxCategory};
use crate::utils::format_units;
use async_trait::async_trait;
use serde_json::Value;

pub struct SolscanClient {
    http: reqwest::Client,
    base_url: String,
    tx_url: String,
    limiter: RateLimiter,
}

impl SolscanClient {
    pub fn new(http: reqwest::Client, config: &ExplorerServiceConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            tx_url: config.tx_url.clone(),
            limiter: RateLimiter::per_second(config.rate_limit_per_second),
        }
    }

    fn normalize(&self, item: &Value) -> Option<TransactionRecord> {
        let hash = text_field(item, &["txHash", "tx_hash", "signature", "trans_id"])?;

        let raw_amount = text_field(item, &["lamport", "changeAmount", "amount"]).unwrap_or_default();
        let decimals = u64_field(item, &["token_decimals", "decimals"])
            .and_then(|d| u8::try_from(d).ok())
            .unwrap_or_else(|| Chain::Sol.native_decimals());

        Some(TransactionRecord {
            explorer_url: format!("{}{}", self.tx_url, hash),
            from: text_field(item, &["src", "from_address", "from"]).unwrap_or_default(),
            to: text_field(item, &["dst", "to_address", "to"]).unwrap_or_default(),
            block_number: u64_field(item, &["slot", "block_id", "blockNumber"]).unwrap_or(0),
            timestamp: u64_field(item, &["blockTime", "block_time", "timestamp"]).unwrap_or(0) as i64,
            amount: format_units(&raw_amount, decimals),
            token: text_field(item, &["token_symbol", "symbol"])
                .unwrap_or_else(|| Chain::Sol.native_symbol().to_string()),
            hash,
        })
    }
}

#[async_trait]
impl Explorer for SolscanClient {
    #[tracing::instrument(skip(self, request), fields(service = "solscan"))]
    async fn fetch_latest(&self, request: &FetchRequest) -> Result<Vec<TransactionRecord>, ExplorerError> {
        if request.category != TxCategory::Native {
            return Err(ExplorerError::Unsupported {
                chain: request.chain,
                category: request.category,
            });
        }

        // the account endpoints only serve the newest page; `request.order` does not apply
        let page_size = request.page_size.to_string();
        let mut builder = self.http.get(&self.base_url).query(&[
            ("address", request.address.as_str()),
            ("limit", page_size.as_str()),
            ("page_size", page_size.as_str()),
        ]);

        let api_key = request.api_key.trim();
        if !api_key.is_empty() {
            builder = builder.header("token", api_key);
        }

        self.limiter.acquire().await;

        let body = read_json(builder.send().await?).await?;

        let records: Vec<TransactionRecord> = extract_transactions(&body)?
            .iter()
            .filter_map(|item| self.normalize(item))
            .filter(|record| record.block_number >= request.start_block)
            .collect();

        tracing::debug!(count = records.len(), "Fetched transactions");
        Ok(records)
    }
}
