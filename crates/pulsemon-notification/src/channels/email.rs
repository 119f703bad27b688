use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pulsemon_common::types::AlertEvent;

use crate::breaker::Breaker;
use crate::NotificationChannel;

/// Delivers alerts as plain-text email over SMTP.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    recipients: Vec<String>,
    breaker: Breaker,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
        recipients: Vec<String>,
    ) -> Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);
        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
            recipients,
            breaker: Breaker::new("email"),
        })
    }

    pub(crate) fn subject(alert: &AlertEvent) -> String {
        let status_tag = if alert.status.is_resolved() {
            " [RESOLVED]"
        } else {
            ""
        };
        format!(
            "[pulsemon][{}]{} {} - {}",
            alert.severity, status_tag, alert.alert_type, alert.service_name
        )
    }

    pub(crate) fn body(alert: &AlertEvent) -> String {
        let mut body = format!(
            "Alert: {}\nService: {}\nSeverity: {}\nStatus: {}\nMessage: {}\n",
            alert.alert_type,
            alert.service_name,
            alert.severity.display_name(),
            alert.status,
            alert.message,
        );
        if let (Some(current), Some(threshold)) = (alert.current_value, alert.threshold_value) {
            body.push_str(&format!(
                "Current Value: {current:.2}\nThreshold: {threshold:.2}\n"
            ));
        }
        if let Some(environment) = &alert.environment {
            body.push_str(&format!("Environment: {environment}\n"));
        }
        body.push_str(&format!("Triggered At: {}\n", alert.triggered_at));
        if let Some(resolved_at) = alert.resolved_at {
            body.push_str(&format!("Resolved At: {resolved_at}\n"));
        }
        body
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &AlertEvent) -> Result<()> {
        if !self.breaker.allow() {
            tracing::warn!(alert_id = %alert.alert_id, "Email breaker open, dropping notification");
            return Ok(());
        }
        if self.recipients.is_empty() {
            return Ok(());
        }

        let subject = Self::subject(alert);
        let body = Self::body(alert);

        for recipient in &self.recipients {
            let message = Message::builder()
                .from(self.from.parse()?)
                .to(recipient.parse()?)
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())?;

            if let Err(e) = self.transport.send(message).await {
                self.breaker.record_failure();
                tracing::error!(
                    alert_id = %alert.alert_id,
                    recipient = %recipient,
                    error = %e,
                    "Email send failed"
                );
                return Err(e.into());
            }
        }

        self.breaker.record_success();
        tracing::info!(
            alert_id = %alert.alert_id,
            recipients = self.recipients.len(),
            "Email notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
