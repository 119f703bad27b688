use anyhow::Result;
use pulsemon_bus::kafka::{KafkaBus, KafkaConfig};
use pulsemon_bus::MessageBus;
use pulsemon_notification::channels::email::EmailChannel;
use pulsemon_notification::channels::slack::SlackChannel;
use pulsemon_notification::channels::webhook::WebhookChannel;
use pulsemon_notification::config::NotificationConfig;
use pulsemon_notification::consumer::AlertConsumer;
use pulsemon_notification::service::Notifier;
use pulsemon_notification::throttler::{NotificationThrottler, ThrottleConfig};
use pulsemon_notification::NotificationChannel;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

fn build_channels(config: &NotificationConfig) -> Vec<Arc<dyn NotificationChannel>> {
    let section = &config.notifications;
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    for name in &section.enabled_channels {
        match name.as_str() {
            "slack" => match &section.slack.webhook_url {
                Some(url) => match SlackChannel::new(
                    url.clone(),
                    section.slack.channel.clone(),
                    section.slack.mention_on_critical,
                    section.slack.critical_user_id.clone(),
                ) {
                    Ok(channel) => channels.push(Arc::new(channel)),
                    Err(e) => tracing::error!(error = %e, "Failed to build Slack channel"),
                },
                None => tracing::error!("Slack channel enabled but webhook_url missing"),
            },
            "email" => match (&section.email.smtp_host, &section.email.from) {
                (Some(host), Some(from)) => match EmailChannel::new(
                    host,
                    section.email.smtp_port,
                    section.email.smtp_username.as_deref(),
                    section.email.smtp_password.as_deref(),
                    from,
                    section.email.recipients.clone(),
                ) {
                    Ok(channel) => channels.push(Arc::new(channel)),
                    Err(e) => tracing::error!(error = %e, "Failed to build email channel"),
                },
                _ => tracing::error!("Email channel enabled but smtp_host/from missing"),
            },
            "webhook" => match WebhookChannel::new(section.webhook.urls.clone()) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(e) => tracing::error!(error = %e, "Failed to build webhook channel"),
            },
            other => tracing::warn!(channel = other, "Unknown notification channel, skipping"),
        }
    }

    channels
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsemon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/notification.toml".to_string());
    let config = NotificationConfig::load(&config_path)?;

    let channels = build_channels(&config);
    tracing::info!(
        brokers = %config.kafka.brokers,
        channels = channels.len(),
        "pulsemon-notification starting"
    );

    let throttler = NotificationThrottler::new(ThrottleConfig {
        enabled: config.notifications.throttling.enabled,
        max_notifications_per_hour: config.notifications.throttling.max_notifications_per_hour,
        duplicate_suppression_minutes: config
            .notifications
            .throttling
            .duplicate_suppression_minutes,
    });
    let notifier = Arc::new(Notifier::new(channels, throttler));

    let bus: Arc<dyn MessageBus> = Arc::new(KafkaBus::new(KafkaConfig {
        brokers: config.kafka.brokers.clone(),
        client_id: config.kafka.client_id.clone(),
        ..KafkaConfig::default()
    })?);

    let consumer = AlertConsumer::new(
        bus,
        notifier,
        config.kafka.alerts_topic.clone(),
        config.kafka.group_id.clone(),
    );
    let consumer_handle = tokio::spawn(async move {
        loop {
            if let Err(e) = consumer.run().await {
                tracing::error!(error = %e, "Alert consumer stopped, restarting");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    });

    tracing::info!("pulsemon-notification started");

    signal::ctrl_c().await.ok();
    tracing::info!("Shutting down gracefully");
    consumer_handle.abort();
    Ok(())
}
