use futures::future::join_all;
use pulsemon_common::types::{AlertEvent, AlertStatus};
use std::sync::Arc;

use crate::throttler::NotificationThrottler;
use crate::NotificationChannel;

/// Fans one alert out to every configured channel in parallel.
///
/// The throttler runs first; a suppressed alert touches no channel.
/// Per-channel failures are absorbed and logged so one failing sink never
/// blocks the others or the consumer.
pub struct Notifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
    throttler: NotificationThrottler,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, throttler: NotificationThrottler) -> Self {
        Self {
            channels,
            throttler,
        }
    }

    pub async fn dispatch(&self, alert: &AlertEvent) {
        if self.throttler.should_throttle(alert) {
            tracing::info!(
                alert_id = %alert.alert_id,
                service = %alert.service_name,
                "Notification throttled"
            );
            return;
        }

        if !should_notify(alert) {
            tracing::debug!(
                alert_id = %alert.alert_id,
                status = %alert.status,
                "Skipping notification for alert status"
            );
            return;
        }

        let sends = self.channels.iter().map(|channel| {
            let channel = channel.clone();
            async move {
                if let Err(e) = channel.send(alert).await {
                    tracing::error!(
                        channel = channel.name(),
                        alert_id = %alert.alert_id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        });
        join_all(sends).await;

        tracing::debug!(alert_id = %alert.alert_id, "Notification dispatch complete");
    }
}

/// Only active and (auto-)resolved alerts generate notifications.
fn should_notify(alert: &AlertEvent) -> bool {
    matches!(
        alert.status,
        AlertStatus::Active | AlertStatus::Resolved | AlertStatus::AutoResolved
    )
}
