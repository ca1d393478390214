//! Etherscan-family client (Etherscan, BscScan)

use super::{
    extract_transactions, read_json, text_field, u64_field, Explorer, ExplorerError, ExplorerService,
    FetchRequest, RateLimiter,
};
use crate::config::ExplorerServiceConfig;
use crate::models::{Chain, TransactionRecord, TxCategory};
use crate::utils::format_units;
use async_trait::async_trait;
use serde_json::Value;

/// Highest block accepted by the `endblock` parameter
const END_BLOCK: &str = "99999999";

/// Decimals assumed when a token transfer omits `tokenDecimal` or reports
/// one outside the ERC-20 `uint8` range
const DEFAULT_TOKEN_DECIMALS: u8 = 18;

pub struct EtherscanClient {
    http: reqwest::Client,
    chain: Chain,
    service: ExplorerService,
    base_url: String,
    chain_id: Option<u64>,
    tx_url: String,
    limiter: RateLimiter,
}

impl EtherscanClient {
    pub fn new(
        http: reqwest::Client,
        chain: Chain,
        service: ExplorerService,
        config: &ExplorerServiceConfig,
    ) -> Self {
        Self {
            http,
            chain,
            service,
            base_url: config.base_url.clone(),
            chain_id: config.chain_id,
            tx_url: config.tx_url.clone(),
            limiter: RateLimiter::per_second(config.rate_limit_per_second),
        }
    }

    fn action(category: TxCategory) -> &'static str {
        match category {
            TxCategory::Native => "txlist",
            TxCategory::Token => "tokentx",
        }
    }

    fn normalize(&self, category: TxCategory, item: &Value) -> Option<TransactionRecord> {
        let hash = text_field(item, &["hash", "transactionHash", "txHash"])?.to_lowercase();

        let raw_value = text_field(item, &["value", "amount"]).unwrap_or_default();
        let (amount, token) = match category {
            TxCategory::Native => (
                format_units(&raw_value, self.chain.native_decimals()),
                self.chain.native_symbol().to_string(),
            ),
            TxCategory::Token => {
                let decimals = text_field(item, &["tokenDecimal", "token_decimals"])
                    .and_then(|d| d.parse::<u8>().ok())
                    .unwrap_or(DEFAULT_TOKEN_DECIMALS);
                (
                    format_units(&raw_value, decimals),
                    text_field(item, &["tokenSymbol", "token_symbol", "symbol"]).unwrap_or_default(),
                )
            }
        };

        Some(TransactionRecord {
            explorer_url: format!("{}{}", self.tx_url, hash),
            hash,
            from: text_field(item, &["from"]).unwrap_or_default().to_lowercase(),
            to: text_field(item, &["to"]).unwrap_or_default().to_lowercase(),
            block_number: u64_field(item, &["blockNumber", "block_number"]).unwrap_or(0),
            timestamp: u64_field(item, &["timeStamp", "timestamp"]).unwrap_or(0) as i64,
            amount,
            token,
        })
    }
}

#[async_trait]
impl Explorer for EtherscanClient {
    #[tracing::instrument(skip(self, request), fields(service = %self.service, category = %request.category))]
    async fn fetch_latest(&self, request: &FetchRequest) -> Result<Vec<TransactionRecord>, ExplorerError> {
        if request.api_key.trim().is_empty() {
            return Err(ExplorerError::MissingApiKey(self.service));
        }

        let mut query: Vec<(&str, String)> = vec![
            ("module", "account".to_string()),
            ("action", Self::action(request.category).to_string()),
            ("address", request.address.clone()),
            ("startblock", request.start_block.to_string()),
            ("endblock", END_BLOCK.to_string()),
            ("page", "1".to_string()),
            ("offset", request.page_size.to_string()),
            ("sort", request.order.as_sort_param().to_string()),
            ("apikey", request.api_key.trim().to_string()),
        ];
        if let Some(chain_id) = self.chain_id {
            query.push(("chainid", chain_id.to_string()));
        }

        self.limiter.acquire().await;

        let response = self.http.get(&self.base_url).query(&query).send().await?;
        let body = read_json(response).await?;

        let records: Vec<TransactionRecord> = extract_transactions(&body)?
            .iter()
            .filter_map(|item| self.normalize(request.category, item))
            .collect();

        tracing::debug!(count = records.len(), "Fetched transactions");
        Ok(records)
    }
}
