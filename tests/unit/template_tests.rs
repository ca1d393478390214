//! Alert template rendering tests

use chrono::Utc;
use wallet_watch::config::{AppConfig, DEFAULT_MESSAGE_TEMPLATE};
use wallet_watch::models::{Chain, Direction, TransactionLogEntry, TxCategory, Wallet};
use wallet_watch::notifications::{compose_message, render_template, select_template};
use wallet_watch::settings::GlobalSettings;

fn wallet(label: &str, template: &str) -> Wallet {
    Wallet {
        id: "w1".to_string(),
        chain: Chain::Eth,
        address: "0x1111111111111111111111111111111111111111".to_string(),
        label: label.to_string(),
        message_template: template.to_string(),
        created_at: Utc::now(),
    }
}

fn entry(direction: Direction) -> TransactionLogEntry {
    TransactionLogEntry {
        id: "e1".to_string(),
        wallet_id: "w1".to_string(),
        label: "Treasury".to_string(),
        address: "0x1111111111111111111111111111111111111111".to_string(),
        chain: Chain::Eth,
        category: TxCategory::Native,
        hash: "0xabc".to_string(),
        direction,
        amount: "1.5".to_string(),
        token: "ETH".to_string(),
        from: "0x2222222222222222222222222222222222222222".to_string(),
        to: "0x1111111111111111111111111111111111111111".to_string(),
        block_number: 101,
        timestamp: 1_700_000_000,
        explorer_url: "https://etherscan.io/tx/0xabc".to_string(),
        message: String::new(),
    }
}

#[test]
fn test_default_template_renders_every_field() {
    let rendered = render_template(DEFAULT_MESSAGE_TEMPLATE, &wallet("Treasury", ""), &entry(Direction::In));
    assert_eq!(
        rendered,
        "New ETH transaction for Treasury: received 1.5 ETH. Hash: 0xabc"
    );
}

#[test]
fn test_outbound_direction_verb() {
    let rendered = render_template("{direction} {amount} {token}", &wallet("T", ""), &entry(Direction::Out));
    assert_eq!(rendered, "sent 1.5 ETH");
}

#[test]
fn test_label_falls_back_to_address() {
    let rendered = render_template("{label}", &wallet("  ", ""), &entry(Direction::In));
    assert_eq!(rendered, "0x1111111111111111111111111111111111111111");
}

#[test]
fn test_unknown_placeholders_are_left_alone() {
    let rendered = render_template("{nope} {hash} {", &wallet("T", ""), &entry(Direction::In));
    assert_eq!(rendered, "{nope} 0xabc {");
}

#[test]
fn test_substituted_values_are_not_rescanned() {
    let rendered = render_template("{label}|{hash}", &wallet("{hash}", ""), &entry(Direction::In));
    assert_eq!(rendered, "{hash}|0xabc");
}

#[test]
fn test_nested_braces() {
    let rendered = render_template("{{hash}}", &wallet("T", ""), &entry(Direction::In));
    assert_eq!(rendered, "{0xabc}");
}

#[test]
fn test_link_and_type_placeholders() {
    let rendered = render_template("{type} {txUrl} {explorerUrl}", &wallet("T", ""), &entry(Direction::In));
    assert_eq!(
        rendered,
        "native https://etherscan.io/tx/0xabc https://etherscan.io/tx/0xabc"
    );
}

#[test]
fn test_wallet_template_overrides_default() {
    let settings = GlobalSettings::from_config(&AppConfig::default());

    let plain = wallet("T", "");
    assert_eq!(select_template(&plain, &settings), DEFAULT_MESSAGE_TEMPLATE);

    let custom = wallet("T", "{label} moved {amount}");
    assert_eq!(
        compose_message(&custom, &entry(Direction::Out), &settings),
        "T moved 1.5"
    );
}
