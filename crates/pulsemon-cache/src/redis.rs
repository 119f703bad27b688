use crate::{keys, CacheError, MetricsCache};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertStatus, MetricEvent};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// TTL applied to ACTIVE alert states.
const ACTIVE_ALERT_TTL: Duration = Duration::from_secs(24 * 3600);

/// TTL applied to stats hashes.
const STATS_TTL: Duration = Duration::from_secs(3600);

/// Consecutive failures before the breaker opens.
const FAILURE_THRESHOLD: u32 = 5;

/// How long the breaker stays open before a probe is allowed through.
const OPEN_COOLDOWN: Duration = Duration::from_secs(30);

struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Minimal consecutive-failure circuit breaker. While open, every cache
/// operation short-circuits into its fallback without touching the
/// backend; after the cooldown a single probe may close it again.
struct Breaker {
    state: Mutex<BreakerState>,
}

impl Breaker {
    fn new() -> Self {
        Self {
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    fn allow(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match state.opened_at {
            Some(opened_at) => opened_at.elapsed() >= OPEN_COOLDOWN,
            None => true,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.consecutive_failures += 1;
        if state.consecutive_failures >= FAILURE_THRESHOLD && state.opened_at.is_none() {
            tracing::warn!(
                failures = state.consecutive_failures,
                "Cache circuit breaker opened"
            );
            state.opened_at = Some(Instant::now());
        }
    }
}

/// Redis-backed cache client.
///
/// All operations are nonblocking on the caller's scheduler; the
/// connection manager multiplexes and reconnects internally.
pub struct RedisMetricsCache {
    manager: ConnectionManager,
    metric_ttl: Duration,
    breaker: Breaker,
}

impl RedisMetricsCache {
    /// Connects to `url` (e.g. `redis://127.0.0.1/`). `ttl_minutes` is the
    /// default TTL for latest-value keys.
    pub async fn connect(url: &str, ttl_minutes: u64) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        tracing::info!(ttl_minutes, "Connected to cache");
        Ok(Self {
            manager,
            metric_ttl: Duration::from_secs(ttl_minutes * 60),
            breaker: Breaker::new(),
        })
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> bool {
        if !self.breaker.allow() {
            return false;
        }
        let mut conn = self.manager.clone();
        match conn
            .set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
        {
            Ok(()) => {
                self.breaker.record_success();
                true
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(key, error = %e, "Cache write failed");
                false
            }
        }
    }

    async fn get_string(&self, key: &str) -> Option<String> {
        if !self.breaker.allow() {
            return None;
        }
        let mut conn = self.manager.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => {
                self.breaker.record_success();
                value
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn delete_quiet(&self, key: &str) -> bool {
        if !self.breaker.allow() {
            return false;
        }
        let mut conn = self.manager.clone();
        match conn.del::<_, i64>(key).await {
            Ok(count) => {
                self.breaker.record_success();
                count > 0
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(key, error = %e, "Cache delete failed");
                false
            }
        }
    }
}

#[async_trait]
impl MetricsCache for RedisMetricsCache {
    async fn cache_latest_metric(&self, event: &MetricEvent) -> bool {
        let key = keys::metric_key(&event.service_name, event.metric_type.as_str());
        let json = match codec::encode(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode metric for cache");
                return false;
            }
        };
        self.set_with_ttl(&key, &json, self.metric_ttl).await
    }

    async fn latest_metric(&self, service: &str, metric_type: &str) -> Option<MetricEvent> {
        let key = keys::metric_key(service, metric_type);
        let json = self.get_string(&key).await?;
        match codec::decode(&json) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cached metric");
                None
            }
        }
    }

    async fn scan_latest_metrics(&self, service: Option<&str>) -> Vec<MetricEvent> {
        if !self.breaker.allow() {
            return Vec::new();
        }
        let pattern = keys::metric_scan_pattern(service);

        let mut conn = self.manager.clone();
        let keys: Vec<String> = {
            match conn.scan_match::<_, String>(&pattern).await {
                Ok(mut iter) => {
                    let mut keys = Vec::new();
                    while let Some(key) = iter.next_item().await {
                        keys.push(key);
                    }
                    keys
                }
                Err(e) => {
                    self.breaker.record_failure();
                    tracing::error!(pattern, error = %e, "Cache scan failed");
                    return Vec::new();
                }
            }
        };
        self.breaker.record_success();

        let mut events = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(json) = self.get_string(&key).await {
                match codec::decode::<MetricEvent>(&json) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        tracing::warn!(key, error = %e, "Dropping undecodable cached metric")
                    }
                }
            }
        }
        events
    }

    async fn cache_alert_state(
        &self,
        service: &str,
        alert_type: &str,
        alert: &AlertEvent,
    ) -> bool {
        let key = keys::alert_state_key(service, alert_type);
        let json = match codec::encode(alert) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode alert state for cache");
                return false;
            }
        };
        let ttl = if alert.status == AlertStatus::Active {
            ACTIVE_ALERT_TTL
        } else {
            self.metric_ttl
        };
        self.set_with_ttl(&key, &json, ttl).await
    }

    async fn alert_state(&self, service: &str, alert_type: &str) -> Option<AlertEvent> {
        let key = keys::alert_state_key(service, alert_type);
        let json = self.get_string(&key).await?;
        match codec::decode(&json) {
            Ok(alert) => Some(alert),
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cached alert state");
                None
            }
        }
    }

    async fn delete_alert_state(
        &self,
        service: &str,
        alert_type: &str,
    ) -> Result<bool, CacheError> {
        if !self.breaker.allow() {
            return Err(CacheError::Unavailable("circuit breaker open".into()));
        }
        let key = keys::alert_state_key(service, alert_type);
        let mut conn = self.manager.clone();
        match conn.del::<_, i64>(&key).await {
            Ok(count) => {
                self.breaker.record_success();
                Ok(count > 0)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(CacheError::Backend(e.to_string()))
            }
        }
    }

    async fn pending_since(&self, service: &str, alert_type: &str) -> Option<NaiveDateTime> {
        let key = keys::pending_alert_key(service, alert_type);
        let value = self.get_string(&key).await?;
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
        self.set_with_ttl(&key, &value, ttl).await
    }

    async fn clear_pending(&self, service: &str, alert_type: &str) -> bool {
        let key = keys::pending_alert_key(service, alert_type);
        self.delete_quiet(&key).await
    }

    async fn cache_metric_stats(
        &self,
        service: &str,
        metric_type: &str,
        window: &str,
        stats: &HashMap<String, f64>,
    ) -> bool {
        if !self.breaker.allow() {
            return false;
        }
        let key = keys::stats_key(service, metric_type, window);
        let fields: Vec<(String, f64)> =
            stats.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut conn = self.manager.clone();

        let result: redis::RedisResult<()> = async {
            conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
            conn.expire::<_, ()>(&key, STATS_TTL.as_secs() as i64).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.breaker.record_success();
                true
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(key, error = %e, "Cache stats write failed");
                false
            }
        }
    }
}
