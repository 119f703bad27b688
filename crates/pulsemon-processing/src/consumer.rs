use anyhow::Result;
use pulsemon_bus::{MessageBus, OffsetReset, Record, Subscription};
use pulsemon_common::codec;
use pulsemon_common::types::MetricEvent;
use std::sync::Arc;

use crate::aggregator::MetricsAggregator;
use crate::engine::AlertEngine;

/// Drains the raw-metrics topic with manual acknowledgement.
///
/// Each record is dispatched concurrently to the aggregator and the alert
/// engine; the record is acknowledged only after both complete without
/// error, so a failure leaves it on the log for redelivery. Trigger is
/// cache-guarded and resolve is idempotent on the `(alertId, status)` row,
/// which keeps redelivery safe.
pub struct MetricConsumer {
    bus: Arc<dyn MessageBus>,
    aggregator: Arc<MetricsAggregator>,
    engine: Arc<AlertEngine>,
    topic: String,
    group: String,
}

impl MetricConsumer {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        aggregator: Arc<MetricsAggregator>,
        engine: Arc<AlertEngine>,
        topic: String,
        group: String,
    ) -> Self {
        Self {
            bus,
            aggregator,
            engine,
            topic,
            group,
        }
    }

    /// Consumes until the subscription dies; the caller re-invokes with
    /// backoff on error.
    pub async fn run(&self) -> Result<()> {
        let mut subscription = self
            .bus
            .subscribe(&self.topic, &self.group, OffsetReset::Earliest)
            .await?;
        tracing::info!(topic = %self.topic, group = %self.group, "Metric consumer started");

        loop {
            let record = subscription.next().await?;
            self.handle_record(subscription.as_mut(), record).await;
        }
    }

    async fn handle_record(&self, subscription: &mut dyn Subscription, record: Record) {
        let event: MetricEvent = match std::str::from_utf8(&record.payload)
            .map_err(anyhow::Error::from)
            .and_then(|json| codec::decode(json).map_err(anyhow::Error::from))
        {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Undecodable metric record left unacknowledged"
                );
                return;
            }
        };

        tracing::debug!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            service = %event.service_name,
            metric_type = %event.metric_type,
            "Received metric event"
        );

        // Dual track: aggregation and rule evaluation run concurrently.
        // The aggregator absorbs its own failures; only the engine can
        // veto the acknowledgement.
        let (_, evaluation) = tokio::join!(
            self.aggregator.process_metric(&event),
            self.engine.evaluate_metric(&event),
        );

        match evaluation {
            Ok(()) => {
                if let Err(e) = subscription.ack(&record).await {
                    tracing::error!(
                        partition = record.partition,
                        offset = record.offset,
                        error = %e,
                        "Offset commit failed"
                    );
                } else {
                    tracing::debug!(
                        event_id = event.event_id.as_deref().unwrap_or("-"),
                        "Metric processed and acknowledged"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    event_id = event.event_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Metric processing failed; record left for redelivery"
                );
            }
        }
    }
}
