use anyhow::Result;
use pulsemon_bus::MessageBus;
use pulsemon_common::codec;
use pulsemon_common::types::AlertEvent;
use std::sync::Arc;

/// Emits alert events to the alerts topic, keyed by service name so that
/// all alerts for one service keep their publish order.
pub struct AlertPublisher {
    bus: Arc<dyn MessageBus>,
    topic: String,
}

impl AlertPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic: String) -> Self {
        Self { bus, topic }
    }

    /// Publishes one alert event. A broker-side error or timeout is a
    /// failure; success logs the assigned partition and offset.
    pub async fn publish(&self, event: &AlertEvent) -> Result<()> {
        let payload = codec::encode(event)?;
        let meta = self
            .bus
            .publish(&self.topic, &event.service_name, payload.as_bytes())
            .await?;

        tracing::info!(
            alert_id = %event.alert_id,
            service = %event.service_name,
            status = %event.status,
            partition = meta.partition,
            offset = meta.offset,
            "Alert event published"
        );
        Ok(())
    }
}
