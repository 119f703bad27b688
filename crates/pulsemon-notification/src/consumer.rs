use anyhow::Result;
use pulsemon_bus::{MessageBus, OffsetReset};
use pulsemon_common::codec;
use pulsemon_common::types::AlertEvent;
use std::sync::Arc;

use crate::service::Notifier;

/// Consumes the alerts topic and hands each event to the notifier.
///
/// Delivery failures are absorbed inside the notifier (retry, breaker,
/// per-channel logging), so records are acknowledged once dispatch has
/// run; an undecodable record is logged and left unacknowledged.
pub struct AlertConsumer {
    bus: Arc<dyn MessageBus>,
    notifier: Arc<Notifier>,
    topic: String,
    group: String,
}

impl AlertConsumer {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        notifier: Arc<Notifier>,
        topic: String,
        group: String,
    ) -> Self {
        Self {
            bus,
            notifier,
            topic,
            group,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut subscription = self
            .bus
            .subscribe(&self.topic, &self.group, OffsetReset::Earliest)
            .await?;
        tracing::info!(topic = %self.topic, group = %self.group, "Alert consumer started");

        loop {
            let record = subscription.next().await?;

            let alert: AlertEvent = match std::str::from_utf8(&record.payload)
                .map_err(anyhow::Error::from)
                .and_then(|json| codec::decode(json).map_err(anyhow::Error::from))
            {
                Ok(alert) => alert,
                Err(e) => {
                    tracing::error!(
                        partition = record.partition,
                        offset = record.offset,
                        error = %e,
                        "Undecodable alert record left unacknowledged"
                    );
                    continue;
                }
            };

            tracing::info!(
                alert_id = %alert.alert_id,
                service = %alert.service_name,
                severity = %alert.severity,
                status = %alert.status,
                "Received alert event"
            );

            self.notifier.dispatch(&alert).await;

            if let Err(e) = subscription.ack(&record).await {
                tracing::error!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Offset commit failed"
                );
            }
        }
    }
}
