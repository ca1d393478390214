//! Explorer client tests against a mock HTTP server

use mockito::{Matcher, Server};
use serde_json::json;

use wallet_watch::config::ExplorerServiceConfig;
use wallet_watch::explorer::{
    EtherscanClient, Explorer, ExplorerError, ExplorerService, FetchOrder, FetchRequest, SolscanClient,
};
use wallet_watch::models::{Chain, TxCategory};

use crate::support::{EVM_ADDRESS, SOL_ADDRESS};

fn service_config(base_url: String, tx_url: &str) -> ExplorerServiceConfig {
    ExplorerServiceConfig {
        base_url,
        chain_id: None,
        tx_url: tx_url.to_string(),
        api_key: String::new(),
        rate_limit_per_second: 100,
    }
}

fn request(chain: Chain, address: &str, category: TxCategory, api_key: &str) -> FetchRequest {
    FetchRequest {
        chain,
        address: address.to_string(),
        api_key: api_key.to_string(),
        category,
        start_block: 100,
        page_size: 20,
        order: FetchOrder::Ascending,
    }
}

fn etherscan(server: &Server, chain: Chain) -> EtherscanClient {
    EtherscanClient::new(
        reqwest::Client::new(),
        chain,
        ExplorerService::for_chain(chain),
        &service_config(server.url(), "https://etherscan.io/tx/"),
    )
}

#[tokio::test]
async fn test_etherscan_txlist_query_and_parsing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("module".into(), "account".into()),
            Matcher::UrlEncoded("action".into(), "txlist".into()),
            Matcher::UrlEncoded("address".into(), EVM_ADDRESS.into()),
            Matcher::UrlEncoded("startblock".into(), "100".into()),
            Matcher::UrlEncoded("offset".into(), "20".into()),
            Matcher::UrlEncoded("sort".into(), "asc".into()),
            Matcher::UrlEncoded("apikey".into(), "KEY".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "hash": "0xABC",
                    "from": "0x2222222222222222222222222222222222222222",
                    "to": EVM_ADDRESS,
                    "value": "1000000000000000000",
                    "blockNumber": "120",
                    "timeStamp": "1700000000"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let records = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "KEY"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hash, "0xabc");
    assert_eq!(records[0].amount, "1");
    assert_eq!(records[0].token, "ETH");
    assert_eq!(records[0].block_number, 120);
    assert_eq!(records[0].explorer_url, "https://etherscan.io/tx/0xabc");
}

#[tokio::test]
async fn test_bscscan_token_transfers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("action".into(), "tokentx".into()))
        .with_status(200)
        .with_body(
            json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "hash": "0xdef",
                    "from": EVM_ADDRESS,
                    "to": "0x3333333333333333333333333333333333333333",
                    "value": "2500000",
                    "tokenDecimal": "6",
                    "tokenSymbol": "USDC",
                    "blockNumber": "130"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let records = etherscan(&server, Chain::Bsc)
        .fetch_latest(&request(Chain::Bsc, EVM_ADDRESS, TxCategory::Token, "KEY"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records[0].amount, "2.5");
    assert_eq!(records[0].token, "USDC");
}

#[tokio::test]
async fn test_newest_first_requests_descending_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("startblock".into(), "0".into()),
            Matcher::UrlEncoded("sort".into(), "desc".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status":"1","message":"OK","result":[]}"#)
        .create_async()
        .await;

    let mut baseline = request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "KEY");
    baseline.start_block = 0;
    baseline.order = FetchOrder::NewestFirst;

    let records = etherscan(&server, Chain::Eth).fetch_latest(&baseline).await.unwrap();
    mock.assert_async().await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_no_transactions_found_is_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"0","message":"No transactions found","result":[]}"#)
        .create_async()
        .await;

    let records = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "KEY"))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_notok_is_api_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#)
        .create_async()
        .await;

    let result = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "BAD"))
        .await;

    match result {
        Err(ExplorerError::Api(message)) => assert_eq!(message, "NOTOK: Invalid API Key"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_failure_is_classified() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let result = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "KEY"))
        .await;
    assert!(matches!(result, Err(ExplorerError::Http { status: 502 })));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let result = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "KEY"))
        .await;
    assert!(matches!(result, Err(ExplorerError::Malformed(_))));
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = etherscan(&server, Chain::Eth)
        .fetch_latest(&request(Chain::Eth, EVM_ADDRESS, TxCategory::Native, "  "))
        .await;

    assert!(matches!(
        result,
        Err(ExplorerError::MissingApiKey(ExplorerService::Etherscan))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_solscan_sends_token_header_and_filters_old_slots() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("address".into(), SOL_ADDRESS.into()),
            Matcher::UrlEncoded("limit".into(), "20".into()),
        ]))
        .match_header("token", "SOLKEY")
        .with_status(200)
        .with_body(
            json!([
                { "txHash": "NewSig", "slot": 150, "lamport": 500000000, "src": "Other", "dst": SOL_ADDRESS, "blockTime": 1700000100 },
                { "txHash": "OldSig", "slot": 90, "lamport": 1, "src": SOL_ADDRESS, "dst": "Other", "blockTime": 1700000000 }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let client = SolscanClient::new(
        reqwest::Client::new(),
        &service_config(server.url(), "https://solscan.io/tx/"),
    );
    let records = client
        .fetch_latest(&request(Chain::Sol, SOL_ADDRESS, TxCategory::Native, "SOLKEY"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hash, "NewSig");
    assert_eq!(records[0].amount, "0.5");
    assert_eq!(records[0].token, "SOL");
    assert_eq!(records[0].explorer_url, "https://solscan.io/tx/NewSig");
}

#[tokio::test]
async fn test_solscan_unsuccessful_envelope() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"success":false,"message":"Unauthorized"}"#)
        .create_async()
        .await;

    let client = SolscanClient::new(
        reqwest::Client::new(),
        &service_config(server.url(), "https://solscan.io/tx/"),
    );
    let result = client
        .fetch_latest(&request(Chain::Sol, SOL_ADDRESS, TxCategory::Native, ""))
        .await;
    assert!(matches!(result, Err(ExplorerError::Api(_))));
}

#[tokio::test]
async fn test_solscan_rejects_token_category() {
    let server = Server::new_async().await;
    let client = SolscanClient::new(
        reqwest::Client::new(),
        &service_config(server.url(), "https://solscan.io/tx/"),
    );
    let result = client
        .fetch_latest(&request(Chain::Sol, SOL_ADDRESS, TxCategory::Token, ""))
        .await;
    assert!(matches!(result, Err(ExplorerError::Unsupported { .. })));
}
