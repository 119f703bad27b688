use async_trait::async_trait;
use pulsemon_common::codec;
use pulsemon_common::types::MetricEvent;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ActiveValue::NotSet};

use crate::entities::metric;
use crate::error::Result;
use crate::store::MonitorStore;
use crate::MetricHistoryStore;

fn to_active_model(event: &MetricEvent) -> Result<metric::ActiveModel> {
    let tags = match &event.tags {
        Some(tags) => Some(serde_json::to_string(tags)?),
        None => None,
    };
    Ok(metric::ActiveModel {
        id: NotSet,
        service_name: Set(event.service_name.clone()),
        metric_type: Set(event.metric_type.as_str().to_string()),
        metric_value: Set(event.metric_value),
        unit: Set(event.unit.clone()),
        timestamp: Set(event.timestamp),
        hostname: Set(event.hostname.clone()),
        environment: Set(event.environment.clone()),
        version: Set(event.version.clone()),
        tags: Set(tags),
        created_at: Set(event.created_at.unwrap_or_else(codec::now)),
    })
}

#[async_trait]
impl MetricHistoryStore for MonitorStore {
    async fn append_metric(&self, event: &MetricEvent) -> Result<i64> {
        let model = to_active_model(event)?.insert(self.db()).await?;
        tracing::debug!(
            id = model.id,
            service = %model.service_name,
            metric_type = %model.metric_type,
            "Persisted metric"
        );
        Ok(model.id)
    }
}
