use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pulsemon_common::types::{AlertEvent, AlertSeverity, AlertStatus};
use serde_json::{json, Value};
use std::time::Duration;

use crate::breaker::Breaker;
use crate::NotificationChannel;

/// Pushes alerts into Slack via an incoming-webhook URL, formatted as a
/// colored attachment with severity emoji and optional mention on
/// CRITICAL.
pub struct SlackChannel {
    client: reqwest::Client,
    webhook_url: String,
    channel: Option<String>,
    mention_on_critical: bool,
    critical_user_id: Option<String>,
    breaker: Breaker,
}

impl SlackChannel {
    pub fn new(
        webhook_url: String,
        channel: Option<String>,
        mention_on_critical: bool,
        critical_user_id: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            webhook_url,
            channel,
            mention_on_critical,
            critical_user_id,
            breaker: Breaker::new("slack"),
        })
    }

    fn pretext(&self, alert: &AlertEvent) -> String {
        let mut pretext = String::new();
        if alert.severity == AlertSeverity::Critical && self.mention_on_critical {
            if let Some(user) = &self.critical_user_id {
                pretext.push_str(user);
                pretext.push(' ');
            }
        }
        match alert.status {
            AlertStatus::Active => pretext.push_str("*Alert Triggered*"),
            AlertStatus::Resolved | AlertStatus::AutoResolved => {
                pretext.push_str("*Alert Resolved*")
            }
            _ => pretext.push_str("*Alert Update*"),
        }
        pretext
    }

    pub(crate) fn build_payload(&self, alert: &AlertEvent) -> Value {
        let emoji = emoji_for(alert);
        let mut fields = vec![
            json!({"title": "Service", "value": alert.service_name, "short": true}),
            json!({"title": "Severity", "value": alert.severity.display_name(), "short": true}),
        ];
        if let (Some(current), Some(threshold)) = (alert.current_value, alert.threshold_value) {
            fields.push(json!({
                "title": "Current Value",
                "value": format!("{current:.2}"),
                "short": true
            }));
            fields.push(json!({
                "title": "Threshold",
                "value": format!("{threshold:.2}"),
                "short": true
            }));
        }
        if let Some(environment) = &alert.environment {
            fields.push(json!({"title": "Environment", "value": environment, "short": true}));
        }

        json!({
            "channel": self.channel,
            "text": format!("{emoji} {}", self.pretext(alert)),
            "attachments": [{
                "color": alert.severity.color_code(),
                "title": format!("{} - {}", alert.service_name, alert.alert_type),
                "text": alert.message,
                "fields": fields,
                "footer": "pulsemon",
                "ts": chrono::Utc::now().timestamp(),
            }],
        })
    }
}

fn emoji_for(alert: &AlertEvent) -> &'static str {
    if alert.status.is_resolved() {
        return ":white_check_mark:";
    }
    match alert.severity {
        AlertSeverity::Low => ":information_source:",
        AlertSeverity::Medium => ":warning:",
        AlertSeverity::High => ":exclamation:",
        AlertSeverity::Critical => ":rotating_light:",
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    async fn send(&self, alert: &AlertEvent) -> Result<()> {
        if !self.breaker.allow() {
            tracing::warn!(alert_id = %alert.alert_id, "Slack breaker open, dropping notification");
            return Ok(());
        }

        let payload = self.build_payload(alert);
        let mut last_err = None;
        for attempt in 0..3u32 {
            match self.client.post(&self.webhook_url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    self.breaker.record_success();
                    tracing::info!(alert_id = %alert.alert_id, "Slack notification sent");
                    return Ok(());
                }
                Ok(response) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %response.status(),
                        "Slack returned non-success status, retrying"
                    );
                    last_err = Some(anyhow!("HTTP {}", response.status()));
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Slack send failed, retrying");
                    last_err = Some(e.into());
                }
            }
            if attempt < 2 {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
        }

        self.breaker.record_failure();
        Err(last_err.unwrap_or_else(|| anyhow!("Slack send failed")))
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
