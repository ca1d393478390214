//! Alert rendering and delivery
//!
//! Each accepted transaction is rendered through a message template and
//! posted to the configured webhook. Delivery is best effort: failures are
//! logged and never reach the poll cycle.

pub mod webhook;

pub use webhook::WebhookNotifier;

use crate::models::{TransactionLogEntry, Wallet};
use crate::settings::GlobalSettings;
use std::sync::Arc;

/// Outcome of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Webhook accepted the message
    Sent,
    /// Nothing to send (no webhook URL or an empty message)
    Skipped,
    /// Delivery failed; already logged
    Failed(String),
}

impl DispatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchResult::Sent => "sent",
            DispatchResult::Skipped => "skipped",
            DispatchResult::Failed(_) => "failed",
        }
    }
}

/// Webhook transport
#[async_trait::async_trait]
pub trait WebhookSink: Send + Sync {
    /// Post `content` to `url`
    async fn send(&self, url: &str, content: &str) -> anyhow::Result<()>;
}

/// Value for a template placeholder, or `None` when the name is unknown
fn placeholder(name: &str, wallet: &Wallet, entry: &TransactionLogEntry) -> Option<String> {
    let value = match name {
        "label" => wallet.display_label().to_string(),
        "address" => wallet.address.clone(),
        "chain" => entry.chain.to_string(),
        "hash" => entry.hash.clone(),
        "amount" => entry.amount.clone(),
        "token" => entry.token.clone(),
        "direction" => entry.direction.verb().to_string(),
        "from" => entry.from.clone(),
        "to" => entry.to.clone(),
        "txUrl" | "explorerUrl" => entry.explorer_url.clone(),
        "type" => entry.category.to_string(),
        _ => return None,
    };
    Some(value)
}

/// Substitute `{name}` placeholders in one pass.
///
/// Unknown placeholders are left untouched and substituted values are never
/// rescanned.
pub fn render_template(template: &str, wallet: &Wallet, entry: &TransactionLogEntry) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            placeholder(&after[..close], wallet, entry).map(|value| (value, close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Wallet template when set, otherwise the global default
pub fn select_template<'a>(wallet: &'a Wallet, settings: &'a GlobalSettings) -> &'a str {
    if wallet.message_template.trim().is_empty() {
        &settings.default_message_template
    } else {
        &wallet.message_template
    }
}

/// Render the alert message for an entry
pub fn compose_message(wallet: &Wallet, entry: &TransactionLogEntry, settings: &GlobalSettings) -> String {
    render_template(select_template(wallet, settings), wallet, entry)
}

/// Renders alerts and hands them to the webhook sink
pub struct AlertDispatcher {
    sink: Arc<dyn WebhookSink>,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn WebhookSink>) -> Self {
        Self { sink }
    }

    /// Send the alert for one log entry. Never fails.
    pub async fn dispatch(
        &self,
        wallet: &Wallet,
        entry: &TransactionLogEntry,
        settings: &GlobalSettings,
    ) -> DispatchResult {
        let url = settings.webhook_url.trim();
        if url.is_empty() {
            return DispatchResult::Skipped;
        }

        let message = if entry.message.trim().is_empty() {
            compose_message(wallet, entry, settings)
        } else {
            entry.message.clone()
        };
        if message.trim().is_empty() {
            return DispatchResult::Skipped;
        }

        match self.sink.send(url, &message).await {
            Ok(()) => {
                tracing::debug!(wallet = %wallet.address, hash = %entry.hash, "Alert sent");
                DispatchResult::Sent
            }
            Err(e) => {
                tracing::warn!(
                    wallet = %wallet.address,
                    hash = %entry.hash,
                    error = %e,
                    "Failed to send alert"
                );
                DispatchResult::Failed(e.to_string())
            }
        }
    }
}
