use pulsemon_cache::MetricsCache;
use pulsemon_common::types::MetricEvent;
use pulsemon_storage::MetricHistoryStore;
use std::sync::Arc;

/// Per-operation result of one aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct AggregationOutcome {
    pub cached: bool,
    pub persisted: bool,
}

/// Runs each metric through the two aggregation operations, latest-value
/// caching and history persistence, concurrently.
///
/// The aggregator never fails its caller: cache errors degrade to "not
/// cached" inside the cache client, and persistence errors are logged and
/// reported as `persisted = false`. The alert pipeline proceeds either
/// way.
pub struct MetricsAggregator {
    cache: Arc<dyn MetricsCache>,
    metrics: Arc<dyn MetricHistoryStore>,
}

impl MetricsAggregator {
    pub fn new(cache: Arc<dyn MetricsCache>, metrics: Arc<dyn MetricHistoryStore>) -> Self {
        Self { cache, metrics }
    }

    pub async fn process_metric(&self, event: &MetricEvent) -> AggregationOutcome {
        tracing::debug!(
            service = %event.service_name,
            metric_type = %event.metric_type,
            value = event.metric_value,
            "Processing metric"
        );

        let (cached, persisted) = tokio::join!(
            self.cache.cache_latest_metric(event),
            self.persist_history(event),
        );

        tracing::debug!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            cached,
            persisted,
            "Metric aggregation complete"
        );
        AggregationOutcome { cached, persisted }
    }

    async fn persist_history(&self, event: &MetricEvent) -> bool {
        match self.metrics.append_metric(event).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    service = %event.service_name,
                    error = %e,
                    "Failed to persist metric"
                );
                false
            }
        }
    }
}
