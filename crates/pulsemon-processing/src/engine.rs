use anyhow::{anyhow, Result};
use pulsemon_cache::MetricsCache;
use pulsemon_common::codec;
use pulsemon_common::types::{self, AlertEvent, AlertSeverity, AlertStatus, MetricEvent};
use pulsemon_storage::{AlertHistoryStore, AlertRuleStore, AlertRuleRow};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::evaluator;
use crate::publisher::AlertPublisher;

/// Core alert evaluation engine.
///
/// For each metric the engine walks the applicable rules and drives the
/// per-`(service, alertType)` state machine: NONE to ACTIVE when the
/// condition fires, ACTIVE back to NONE when it stops. The state lives in
/// the alert-state cache entry; there is no process-local state, so any
/// consumer instance holding the partition can continue where another
/// left off.
pub struct AlertEngine {
    rules: Arc<dyn AlertRuleStore>,
    alerts: Arc<dyn AlertHistoryStore>,
    cache: Arc<dyn MetricsCache>,
    publisher: AlertPublisher,
}

impl AlertEngine {
    pub fn new(
        rules: Arc<dyn AlertRuleStore>,
        alerts: Arc<dyn AlertHistoryStore>,
        cache: Arc<dyn MetricsCache>,
        publisher: AlertPublisher,
    ) -> Self {
        Self {
            rules,
            alerts,
            cache,
            publisher,
        }
    }

    /// Evaluates one metric against every applicable rule.
    ///
    /// Rules run sequentially so cache reads and writes stay causally
    /// ordered per `(service, alertType)`. An error leaves the record
    /// unacknowledged upstream.
    pub async fn evaluate_metric(&self, metric: &MetricEvent) -> Result<()> {
        tracing::debug!(
            service = %metric.service_name,
            metric_type = %metric.metric_type,
            value = metric.metric_value,
            "Evaluating metric for alerts"
        );

        let rules = self
            .rules
            .find_applicable(&metric.service_name, metric.metric_type.as_str())
            .await?;

        for rule in rules {
            self.evaluate_rule(metric, &rule).await?;
        }
        Ok(())
    }

    async fn evaluate_rule(&self, metric: &MetricEvent, rule: &AlertRuleRow) -> Result<()> {
        let alert_type = types::alert_type(&rule.metric_type, &rule.severity);
        let existing = self.cache.alert_state(&metric.service_name, &alert_type).await;
        let fired = evaluator::evaluate(
            Some(metric.metric_value),
            Some(rule.threshold_value),
            &rule.comparison_operator,
        );
        let active = existing.as_ref().is_some_and(AlertEvent::is_active);

        if fired && !active {
            return self.handle_trigger(metric, rule, &alert_type).await;
        }
        if !fired {
            // The condition stopped holding; any running duration window
            // is void.
            self.cache.clear_pending(&metric.service_name, &alert_type).await;
            if let Some(existing) = existing.filter(AlertEvent::is_active) {
                return self.handle_resolution(existing, metric).await;
            }
        }
        Ok(())
    }

    /// Trigger path: gate on the rule's duration window, then write the
    /// cache state, append history and publish, in that order, so a
    /// redelivery of the metric finds the ACTIVE state and does nothing.
    async fn handle_trigger(
        &self,
        metric: &MetricEvent,
        rule: &AlertRuleRow,
        alert_type: &str,
    ) -> Result<()> {
        if rule.duration_minutes > 0 && !self.duration_elapsed(metric, rule, alert_type).await {
            return Ok(());
        }
        self.cache.clear_pending(&metric.service_name, alert_type).await;

        tracing::info!(
            service = %metric.service_name,
            alert_type,
            value = metric.metric_value,
            threshold = rule.threshold_value,
            "Alert condition met"
        );

        let alert = build_alert_event(metric, rule, alert_type);

        // Cache write precedes persist and publish; failures degrade to
        // "not cached" and the pipeline continues (cache unavailability
        // must not stall alerting).
        self.cache
            .cache_alert_state(&metric.service_name, alert_type, &alert)
            .await;

        if let Err(e) = self.alerts.append_alert(&alert).await {
            // History is an audit log; the cache entry is the state of
            // record for this transition.
            tracing::error!(alert_id = %alert.alert_id, error = %e, "Failed to persist alert");
        }

        self.publisher.publish(&alert).await?;

        tracing::info!(
            alert_id = %alert.alert_id,
            service = %metric.service_name,
            alert_type,
            "Alert triggered"
        );
        Ok(())
    }

    /// Tracks the first violating sample in the pending key and reports
    /// whether the condition has now held for the rule's duration window.
    /// Sample timestamps, not the wall clock, measure the window, so
    /// redelivered records reach the same verdict.
    async fn duration_elapsed(
        &self,
        metric: &MetricEvent,
        rule: &AlertRuleRow,
        alert_type: &str,
    ) -> bool {
        let window = chrono::Duration::minutes(i64::from(rule.duration_minutes));
        match self.cache.pending_since(&metric.service_name, alert_type).await {
            None => {
                let ttl = Duration::from_secs(rule.duration_minutes as u64 * 60 * 2);
                self.cache
                    .mark_pending(&metric.service_name, alert_type, metric.timestamp, ttl)
                    .await;
                tracing::debug!(
                    service = %metric.service_name,
                    alert_type,
                    duration_minutes = rule.duration_minutes,
                    "Violation window opened"
                );
                false
            }
            Some(first) => metric.timestamp - first >= window,
        }
    }

    /// Resolve path: delete the cache state, update the history row, then
    /// publish. Cache deletion and the history update must both succeed;
    /// an error propagates so the record is redelivered.
    async fn handle_resolution(&self, mut alert: AlertEvent, metric: &MetricEvent) -> Result<()> {
        tracing::info!(
            service = %metric.service_name,
            alert_type = %alert.alert_type,
            "Alert condition resolved"
        );

        alert.resolve(codec::now(), metric.metric_value);

        self.cache
            .delete_alert_state(&metric.service_name, &alert.alert_type)
            .await
            .map_err(|e| anyhow!("alert state deletion failed: {e}"))?;

        if !self.alerts.mark_resolved(&alert).await? {
            // The trigger-side persist may have been lost; the resolved
            // event still goes out.
            tracing::warn!(alert_id = %alert.alert_id, "Resolved alert had no history row");
        }

        self.publisher.publish(&alert).await?;

        tracing::info!(
            alert_id = %alert.alert_id,
            service = %metric.service_name,
            duration_seconds = alert.duration_seconds.unwrap_or(0),
            "Alert resolved"
        );
        Ok(())
    }
}

fn build_alert_event(metric: &MetricEvent, rule: &AlertRuleRow, alert_type: &str) -> AlertEvent {
    let now = codec::now();
    let message = format!(
        "{} {} threshold exceeded: current={:.2}, threshold={:.2}",
        metric.metric_type.display_name(),
        rule.comparison_operator,
        metric.metric_value,
        rule.threshold_value
    );

    AlertEvent {
        alert_id: Uuid::new_v4().to_string(),
        service_name: metric.service_name.clone(),
        alert_type: alert_type.to_string(),
        severity: AlertSeverity::from_code(&rule.severity).unwrap_or(AlertSeverity::Low),
        status: AlertStatus::Active,
        message,
        description: rule.description.clone(),
        threshold_value: Some(rule.threshold_value),
        current_value: Some(metric.metric_value),
        triggered_at: now,
        resolved_at: None,
        duration_seconds: None,
        hostname: metric.hostname.clone(),
        environment: metric.environment.clone(),
        metadata: None,
        created_at: Some(now),
    }
}
