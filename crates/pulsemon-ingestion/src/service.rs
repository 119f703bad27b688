use pulsemon_common::codec;
use pulsemon_common::types::{MetricEvent, MetricType};
use uuid::Uuid;

use crate::dto::{MetricBatchRequest, MetricRequest};
use crate::publisher::MetricsEventPublisher;
use crate::validator::MetricValidator;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Metric validation failed: {}", errors.join(", "))]
    Validation { errors: Vec<String> },

    #[error("Publish failed: {0}")]
    Publish(#[from] anyhow::Error),
}

/// Validates submissions, turns them into immutable events and hands
/// them to the publisher.
pub struct MetricsPublishService {
    validator: MetricValidator,
    publisher: MetricsEventPublisher,
}

impl MetricsPublishService {
    pub fn new(validator: MetricValidator, publisher: MetricsEventPublisher) -> Self {
        Self {
            validator,
            publisher,
        }
    }

    pub async fn publish_metric(&self, request: &MetricRequest) -> Result<(), IngestError> {
        let metric_type = self
            .validator
            .validate(request)
            .map_err(|errors| IngestError::Validation { errors })?;

        let event = build_event(request, metric_type);
        self.publisher.publish(&event).await?;
        Ok(())
    }

    /// Validates the whole batch up front (reporting every error with its
    /// index), then publishes each metric. Returns the published count.
    pub async fn publish_batch(&self, batch: &MetricBatchRequest) -> Result<usize, IngestError> {
        if batch.metrics.is_empty() || batch.metrics.len() > MAX_BATCH_SIZE {
            return Err(IngestError::Validation {
                errors: vec![format!(
                    "Batch must contain between 1 and {MAX_BATCH_SIZE} metrics"
                )],
            });
        }

        let mut types = Vec::with_capacity(batch.metrics.len());
        let mut errors = Vec::new();
        for (index, request) in batch.metrics.iter().enumerate() {
            match self.validator.validate(request) {
                Ok(metric_type) => types.push(metric_type),
                Err(request_errors) => {
                    errors.extend(
                        request_errors
                            .into_iter()
                            .map(|e| format!("metrics[{index}]: {e}")),
                    );
                }
            }
        }
        if !errors.is_empty() {
            return Err(IngestError::Validation { errors });
        }

        for (request, metric_type) in batch.metrics.iter().zip(types) {
            let event = build_event(request, metric_type);
            self.publisher.publish(&event).await?;
        }
        Ok(batch.metrics.len())
    }
}

/// Builds the immutable wire event from a validated request. The service
/// name is normalized (trimmed, lowercased) and the unit defaults from
/// the metric type.
fn build_event(request: &MetricRequest, metric_type: MetricType) -> MetricEvent {
    let now = codec::now();
    MetricEvent {
        event_id: Some(Uuid::new_v4().to_string()),
        service_name: request.service_name.trim().to_lowercase(),
        metric_type,
        metric_value: request.metric_value,
        unit: request
            .unit
            .clone()
            .or_else(|| Some(metric_type.unit().to_string())),
        timestamp: request.timestamp.unwrap_or(now),
        hostname: request.hostname.clone(),
        environment: request.environment.as_ref().map(|e| e.to_lowercase()),
        version: request.version.clone(),
        created_at: Some(now),
        tags: request.tags.clone(),
    }
}
