use anyhow::{bail, Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts plain messages to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    pub async fn post(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { text })
            .send()
            .await
            .context("Failed to reach Slack webhook")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Slack webhook returned {}: {}", status, body);
        }

        tracing::info!("Posted license report to Slack");
        Ok(())
    }
}
