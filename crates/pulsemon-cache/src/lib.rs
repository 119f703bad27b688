//! Shared key/value cache client.
//!
//! The cache holds the pipeline's cross-service state: latest metric
//! values, current alert states and pending trigger windows. Operations
//! degrade gracefully when the backend is unavailable: reads come back
//! empty and writes report "not cached". The one exception is alert-state
//! deletion, which participates in redelivery correctness and surfaces
//! its failures to the caller.

pub mod keys;
pub mod memory;
pub mod redis;


use async_trait::async_trait;
use chrono::NaiveDateTime;
use pulsemon_common::types::{AlertEvent, MetricEvent};
use std::collections::HashMap;
use std::time::Duration;

/// Errors from cache operations that are allowed to fail loudly.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The circuit breaker is open; the backend is considered down.
    #[error("Cache: backend unavailable: {0}")]
    Unavailable(String),

    /// An error reported by the backend itself.
    #[error("Cache: backend error: {0}")]
    Backend(String),
}

/// Typed view over the `monitoring:` keyspace (see [`keys`]).
#[async_trait]
pub trait MetricsCache: Send + Sync {
    /// Caches the event under its latest-value key with the configured
    /// metric TTL. Returns `false` when the value was not cached.
    async fn cache_latest_metric(&self, event: &MetricEvent) -> bool;

    /// Latest cached metric for `(service, metricType)`, if any.
    async fn latest_metric(&self, service: &str, metric_type: &str) -> Option<MetricEvent>;

    /// Decodes every latest-value entry, optionally scoped to one service.
    /// An unavailable backend yields an empty list.
    async fn scan_latest_metrics(&self, service: Option<&str>) -> Vec<MetricEvent>;

    /// Caches the alert state under `(service, alertType)`. ACTIVE alerts
    /// get a 24 hour TTL, anything else the metric TTL. Returns `false`
    /// when not cached.
    async fn cache_alert_state(&self, service: &str, alert_type: &str, alert: &AlertEvent)
        -> bool;

    /// Current alert state for `(service, alertType)`; absence means no
    /// active alert.
    async fn alert_state(&self, service: &str, alert_type: &str) -> Option<AlertEvent>;

    /// Removes the alert state. Returns whether a key was deleted; errors
    /// propagate so the caller can refuse to acknowledge the record.
    async fn delete_alert_state(
        &self,
        service: &str,
        alert_type: &str,
    ) -> Result<bool, CacheError>;

    /// First-violation timestamp of a running duration window, if any.
    async fn pending_since(&self, service: &str, alert_type: &str) -> Option<NaiveDateTime>;

    /// Records the first violation of a rule's duration window.
    async fn mark_pending(
        &self,
        service: &str,
        alert_type: &str,
        since: NaiveDateTime,
        ttl: Duration,
    ) -> bool;

    /// Clears a pending window (condition stopped holding).
    async fn clear_pending(&self, service: &str, alert_type: &str) -> bool;

    /// Stores aggregate floats under the stats hash for a window, with a
    /// one hour TTL. Returns `false` when not cached.
    async fn cache_metric_stats(
        &self,
        service: &str,
        metric_type: &str,
        window: &str,
        stats: &HashMap<String, f64>,
    ) -> bool;
}
