use anyhow::Result;
use pulsemon_bus::MessageBus;
use pulsemon_common::codec;
use pulsemon_common::types::MetricEvent;
use std::sync::Arc;

/// Publishes metric events to the raw-metrics topic, keyed by service
/// name so all metrics from one service are processed in order.
pub struct MetricsEventPublisher {
    bus: Arc<dyn MessageBus>,
    topic: String,
}

impl MetricsEventPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic: String) -> Self {
        Self { bus, topic }
    }

    pub async fn publish(&self, event: &MetricEvent) -> Result<()> {
        let payload = codec::encode(event)?;
        let meta = self
            .bus
            .publish(&self.topic, &event.service_name, payload.as_bytes())
            .await?;

        tracing::debug!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            service = %event.service_name,
            partition = meta.partition,
            offset = meta.offset,
            "Metric event published"
        );
        Ok(())
    }
}
