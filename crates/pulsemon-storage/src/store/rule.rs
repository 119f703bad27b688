use async_trait::async_trait;
use chrono::NaiveDateTime;
use pulsemon_common::codec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, Condition,
    EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::entities::alert_rule::{self, Column, Entity};
use crate::error::Result;
use crate::store::MonitorStore;
use crate::AlertRuleStore;

/// 告警规则数据行（来自 alert_rules 表）
#[derive(Debug, Clone)]
pub struct AlertRuleRow {
    pub id: i64,
    pub rule_name: String,
    /// Explicit service name, or `*` for every service.
    pub service_name: String,
    pub metric_type: String,
    pub threshold_value: f64,
    pub comparison_operator: String,
    pub duration_minutes: i32,
    pub severity: String,
    pub enabled: bool,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AlertRuleRow {
    pub fn is_wildcard(&self) -> bool {
        self.service_name == "*"
    }
}

/// Insert payload for rule provisioning and seeding.
#[derive(Debug, Clone)]
pub struct NewAlertRule {
    pub rule_name: String,
    pub service_name: String,
    pub metric_type: String,
    pub threshold_value: f64,
    pub comparison_operator: String,
    pub duration_minutes: i32,
    pub severity: String,
    pub enabled: bool,
    pub description: Option<String>,
}

fn to_row(m: alert_rule::Model) -> AlertRuleRow {
    AlertRuleRow {
        id: m.id,
        rule_name: m.rule_name,
        service_name: m.service_name,
        metric_type: m.metric_type,
        threshold_value: m.threshold_value,
        comparison_operator: m.comparison_operator,
        duration_minutes: m.duration_minutes,
        severity: m.severity,
        enabled: m.enabled,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

impl MonitorStore {
    pub async fn insert_rule(&self, rule: &NewAlertRule) -> Result<AlertRuleRow> {
        let now = codec::now();
        let model = alert_rule::ActiveModel {
            id: NotSet,
            rule_name: Set(rule.rule_name.clone()),
            service_name: Set(rule.service_name.clone()),
            metric_type: Set(rule.metric_type.clone()),
            threshold_value: Set(rule.threshold_value),
            comparison_operator: Set(rule.comparison_operator.clone()),
            duration_minutes: Set(rule.duration_minutes),
            severity: Set(rule.severity.clone()),
            enabled: Set(rule.enabled),
            description: Set(rule.description.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await?;
        Ok(to_row(model))
    }

    pub async fn count_rules(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }
}

#[async_trait]
impl AlertRuleStore for MonitorStore {
    async fn find_applicable(
        &self,
        service: &str,
        metric_type: &str,
    ) -> Result<Vec<AlertRuleRow>> {
        let mut rows: Vec<AlertRuleRow> = Entity::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::MetricType.eq(metric_type))
            .filter(
                Condition::any()
                    .add(Column::ServiceName.eq(service))
                    .add(Column::ServiceName.eq("*")),
            )
            .all(self.db())
            .await?
            .into_iter()
            .map(to_row)
            .collect();

        // Service-specific before wildcard, insertion order within each.
        rows.sort_by_key(|r| (r.is_wildcard(), r.id));
        Ok(rows)
    }
}
