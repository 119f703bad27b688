use async_trait::async_trait;
use pulsemon_common::codec;
use pulsemon_common::types::AlertEvent;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, EntityTrait,
    QueryFilter, SqlErr,
};

use crate::entities::alert::{self, Column, Entity};
use crate::error::Result;
use crate::store::MonitorStore;
use crate::AlertHistoryStore;

fn to_active_model(event: &AlertEvent) -> Result<alert::ActiveModel> {
    let metadata = match &event.metadata {
        Some(metadata) => Some(serde_json::to_string(metadata)?),
        None => None,
    };
    Ok(alert::ActiveModel {
        id: NotSet,
        alert_id: Set(event.alert_id.clone()),
        service_name: Set(event.service_name.clone()),
        alert_type: Set(event.alert_type.clone()),
        severity: Set(event.severity.as_str().to_string()),
        status: Set(event.status.as_str().to_string()),
        message: Set(event.message.clone()),
        description: Set(event.description.clone()),
        threshold_value: Set(event.threshold_value),
        current_value: Set(event.current_value),
        triggered_at: Set(event.triggered_at),
        resolved_at: Set(event.resolved_at),
        duration_seconds: Set(event.duration_seconds),
        hostname: Set(event.hostname.clone()),
        environment: Set(event.environment.clone()),
        metadata: Set(metadata),
        created_at: Set(codec::now()),
    })
}

#[async_trait]
impl AlertHistoryStore for MonitorStore {
    async fn append_alert(&self, event: &AlertEvent) -> Result<()> {
        match to_active_model(event)?.insert(self.db()).await {
            Ok(model) => {
                tracing::debug!(id = model.id, alert_id = %model.alert_id, "Persisted alert");
                Ok(())
            }
            // Redelivered TRIGGER: the row is already there.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(alert_id = %event.alert_id, "Alert row already persisted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_resolved(&self, event: &AlertEvent) -> Result<bool> {
        let Some(model) = Entity::find()
            .filter(Column::AlertId.eq(event.alert_id.as_str()))
            .one(self.db())
            .await?
        else {
            tracing::warn!(alert_id = %event.alert_id, "No alert row to resolve");
            return Ok(false);
        };

        let mut active: alert::ActiveModel = model.into();
        active.status = Set(event.status.as_str().to_string());
        active.resolved_at = Set(event.resolved_at);
        active.duration_seconds = Set(event.duration_seconds);
        active.current_value = Set(event.current_value);
        active.update(self.db()).await?;

        tracing::debug!(alert_id = %event.alert_id, "Alert row resolved");
        Ok(true)
    }
}
