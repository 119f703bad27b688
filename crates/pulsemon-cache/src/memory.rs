use crate::{keys, CacheError, MetricsCache};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertStatus, MetricEvent};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// In-memory cache with the same contract as the Redis client, including
/// TTL expiry and prefix scans. Backs development and the engine test
/// suites.
#[derive(Default)]
pub struct InMemoryMetricsCache {
    entries: Mutex<HashMap<String, Entry>>,
    metric_ttl: Option<Duration>,
}

impl InMemoryMetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose latest-value keys expire after `ttl`.
    pub fn with_metric_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            metric_ttl: Some(ttl),
        }
    }

    fn put(&self, key: String, value: String, ttl: Option<Duration>) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(
            key,
            Entry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.get(key) {
            Some(entry) if entry.live() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.remove(key) {
            Some(entry) => entry.live(),
            None => false,
        }
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.live())
            .map(|(_, entry)| entry.value.clone())
            .collect()
    }
}

#[async_trait]
impl MetricsCache for InMemoryMetricsCache {
    async fn cache_latest_metric(&self, event: &MetricEvent) -> bool {
        let key = keys::metric_key(&event.service_name, event.metric_type.as_str());
        match codec::encode(event) {
            Ok(json) => {
                self.put(key, json, self.metric_ttl);
                true
            }
            Err(_) => false,
        }
    }

    async fn latest_metric(&self, service: &str, metric_type: &str) -> Option<MetricEvent> {
        let json = self.get(&keys::metric_key(service, metric_type))?;
        codec::decode(&json).ok()
    }

    async fn scan_latest_metrics(&self, service: Option<&str>) -> Vec<MetricEvent> {
        let pattern = keys::metric_scan_pattern(service);
        let prefix = pattern.trim_end_matches('*');
        self.scan_prefix(prefix)
            .into_iter()
            .filter_map(|json| codec::decode(&json).ok())
            .collect()
    }

    async fn cache_alert_state(
        &self,
        service: &str,
        alert_type: &str,
        alert: &AlertEvent,
    ) -> bool {
        let key = keys::alert_state_key(service, alert_type);
        let ttl = if alert.status == AlertStatus::Active {
            Some(Duration::from_secs(24 * 3600))
        } else {
            self.metric_ttl
        };
        match codec::encode(alert) {
            Ok(json) => {
                self.put(key, json, ttl);
                true
            }
            Err(_) => false,
        }
    }

    async fn alert_state(&self, service: &str, alert_type: &str) -> Option<AlertEvent> {
        let json = self.get(&keys::alert_state_key(service, alert_type))?;
        codec::decode(&json).ok()
    }

    async fn delete_alert_state(
        &self,
        service: &str,
        alert_type: &str,
    ) -> Result<bool, CacheError> {
        Ok(self.remove(&keys::alert_state_key(service, alert_type)))
    }

    async fn pending_since(&self, service: &str, alert_type: &str) -> Option<NaiveDateTime> {
        let value = self.get(&keys::pending_alert_key(service, alert_type))?;
        NaiveDateTime::parse_from_str(&value, codec::DATETIME_FORMAT).ok()
    }

    async fn mark_pending(
        &self,
        service: &str,
        alert_type: &str,
        since: NaiveDateTime,
        ttl: Duration,
    ) -> bool {
        let key = keys::pending_alert_key(service, alert_type);
        let value = since.format(codec::DATETIME_FORMAT).to_string();
        self.put(key, value, Some(ttl));
        true
    }

    async fn clear_pending(&self, service: &str, alert_type: &str) -> bool {
        self.remove(&keys::pending_alert_key(service, alert_type))
    }

    async fn cache_metric_stats(
        &self,
        service: &str,
        metric_type: &str,
        window: &str,
        stats: &HashMap<String, f64>,
    ) -> bool {
        let key = keys::stats_key(service, metric_type, window);
        match serde_json::to_string(stats) {
            Ok(json) => {
                self.put(key, json, Some(Duration::from_secs(3600)));
                true
            }
            Err(_) => false,
        }
    }
}
