use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pulsemon_common::codec;
use pulsemon_common::types::AlertEvent;
use std::time::Duration;

use crate::breaker::Breaker;
use crate::NotificationChannel;

/// Posts the full alert event JSON to each configured webhook URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    urls: Vec<String>,
    breaker: Breaker,
}

impl WebhookChannel {
    pub fn new(urls: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            urls,
            breaker: Breaker::new("webhook"),
        })
    }

    async fn post_with_retry(&self, url: &str, body: &str) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..3u32 {
            match self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .body(body.to_string())
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %response.status(),
                        "Webhook returned non-success status, retrying"
                    );
                    last_err = Some(anyhow!("HTTP {}", response.status()));
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Webhook send failed, retrying");
                    last_err = Some(e.into());
                }
            }
            if attempt < 2 {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("webhook send failed")))
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &AlertEvent) -> Result<()> {
        if !self.breaker.allow() {
            tracing::warn!(alert_id = %alert.alert_id, "Webhook breaker open, dropping notification");
            return Ok(());
        }
        if self.urls.is_empty() {
            return Ok(());
        }

        let body = codec::encode(alert)?;
        let mut failed = 0usize;
        for url in &self.urls {
            if let Err(e) = self.post_with_retry(url, &body).await {
                failed += 1;
                tracing::error!(url = %url, error = %e, "Webhook failed after 3 retries");
            }
        }

        if failed == self.urls.len() {
            self.breaker.record_failure();
            return Err(anyhow!("all {failed} webhook targets failed"));
        }
        self.breaker.record_success();
        tracing::info!(
            alert_id = %alert.alert_id,
            targets = self.urls.len() - failed,
            "Webhook notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
