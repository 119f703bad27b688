//! Notification service.
//!
//! Consumes the alerts topic and routes each alert through the configured
//! delivery channels (Slack, email, webhook). A process-local throttler
//! suppresses duplicates and rate-limits per service before any channel
//! is touched; each external sink sits behind retry and a circuit
//! breaker so a failing integration degrades to dropped-and-logged
//! rather than blocking the pipeline.

pub mod breaker;
pub mod channels;
pub mod config;
pub mod consumer;
pub mod service;
pub mod throttler;


use anyhow::Result;
use async_trait::async_trait;
use pulsemon_common::types::AlertEvent;

/// A delivery channel that pushes alert events to an external service.
///
/// Implementations absorb transient failures internally (retry, breaker);
/// an `Err` means the alert was definitively not delivered.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, alert: &AlertEvent) -> Result<()>;

    /// Channel name as referenced by `enabled_channels` (e.g. `"slack"`).
    fn name(&self) -> &'static str;
}
