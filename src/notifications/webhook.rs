//! Discord-compatible webhook delivery
//!
//! Posts `{"content": message}` as JSON. No retries; a non-2xx status is an
//! error for the caller to log.

use super::WebhookSink;
use std::time::Duration;

/// Webhook notifier over a shared HTTP client
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier with the given per-request timeout
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl WebhookSink for WebhookNotifier {
    async fn send(&self, url: &str, content: &str) -> anyhow::Result<()> {
        let payload = serde_json::json!({ "content": content });

        let response = self.client.post(url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook error: {} - {}", status, body);
        }

        Ok(())
    }
}
