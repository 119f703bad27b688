//! Relational stores for metric history, alert history and alert rules.
//!
//! [`MonitorStore`] is the SeaORM-backed access layer; the engine-facing
//! seams are the [`MetricHistoryStore`], [`AlertHistoryStore`] and
//! [`AlertRuleStore`] traits so the processing pipeline can run against
//! in-memory doubles in tests.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use pulsemon_common::types::{AlertEvent, MetricEvent};

pub use error::StorageError;
pub use store::rule::{AlertRuleRow, NewAlertRule};
pub use store::MonitorStore;

/// Append-mostly store of raw metric rows.
#[async_trait]
pub trait MetricHistoryStore: Send + Sync {
    /// Appends one metric row; returns the generated row id.
    async fn append_metric(&self, event: &MetricEvent) -> error::Result<i64>;
}

/// Append-mostly store of alert rows. Rows are updated exactly once, on
/// resolution.
#[async_trait]
pub trait AlertHistoryStore: Send + Sync {
    /// Appends an alert row. A unique-key violation on `alert_id` is an
    /// idempotent re-persist and reports success.
    async fn append_alert(&self, alert: &AlertEvent) -> error::Result<()>;

    /// Sets `status`, `resolved_at` and `duration_seconds` on the single
    /// row whose `alert_id` matches. Returns whether a row was updated.
    async fn mark_resolved(&self, alert: &AlertEvent) -> error::Result<bool>;
}

/// Queryable store of operator-provisioned alert rules.
#[async_trait]
pub trait AlertRuleStore: Send + Sync {
    /// All enabled rules matching `metric_type` whose scope is either
    /// `service` or the wildcard `*`. Service-specific rules come strictly
    /// before wildcard rules, tie-broken by insertion order.
    async fn find_applicable(
        &self,
        service: &str,
        metric_type: &str,
    ) -> error::Result<Vec<AlertRuleRow>>;
}
