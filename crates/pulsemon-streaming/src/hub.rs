use futures::future::ready;
use futures::stream::{self, Stream, StreamExt};
use pulsemon_bus::{MessageBus, OffsetReset};
use pulsemon_cache::MetricsCache;
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertSeverity, MetricEvent};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};

/// Shared fan-out of the raw-metrics and alerts topics.
///
/// The hub holds one upstream consumer per topic (offset reset `latest`,
/// so dashboards never replay history) and multicasts decoded events to
/// any number of SSE subscribers. Slow subscribers fall behind inside
/// their own bounded buffer and lose the oldest undelivered items; the
/// shared upstream is never blocked.
pub struct StreamHub {
    metrics_tx: broadcast::Sender<MetricEvent>,
    alerts_tx: broadcast::Sender<AlertEvent>,
    cache: Arc<dyn MetricsCache>,
    heartbeat_interval: Duration,
}

impl StreamHub {
    pub fn new(
        cache: Arc<dyn MetricsCache>,
        buffer_size: usize,
        heartbeat_interval: Duration,
    ) -> Self {
        let (metrics_tx, _) = broadcast::channel(buffer_size.max(1));
        let (alerts_tx, _) = broadcast::channel(buffer_size.max(1));
        Self {
            metrics_tx,
            alerts_tx,
            cache,
            heartbeat_interval,
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Spawns the two upstream pump tasks. Transient consumer errors are
    /// retried indefinitely without terminating the shared streams.
    pub fn start(&self, bus: Arc<dyn MessageBus>, metrics_topic: String, alerts_topic: String) {
        tokio::spawn(pump(
            bus.clone(),
            metrics_topic,
            "streaming.metrics".to_string(),
            self.metrics_tx.clone(),
        ));
        tokio::spawn(pump(
            bus,
            alerts_topic,
            "streaming.alerts".to_string(),
            self.alerts_tx.clone(),
        ));
    }

    /// Live metric stream, optionally filtered to one service. The filter
    /// runs at the subscriber so the upstream stream stays shared.
    pub fn subscribe_metrics(
        &self,
        service: Option<String>,
    ) -> impl Stream<Item = MetricEvent> + Send {
        filter_lagged(BroadcastStream::new(self.metrics_tx.subscribe())).filter(move |event| {
            ready(match &service {
                Some(service) => event.service_name.eq_ignore_ascii_case(service),
                None => true,
            })
        })
    }

    /// Live alert stream, optionally filtered to one service.
    pub fn subscribe_alerts(
        &self,
        service: Option<String>,
    ) -> impl Stream<Item = AlertEvent> + Send {
        filter_lagged(BroadcastStream::new(self.alerts_tx.subscribe())).filter(move |event| {
            ready(match &service {
                Some(service) => event.service_name.eq_ignore_ascii_case(service),
                None => true,
            })
        })
    }

    /// High-priority stream carrying only CRITICAL alerts.
    pub fn subscribe_critical_alerts(&self) -> impl Stream<Item = AlertEvent> + Send {
        self.subscribe_alerts(None)
            .filter(|event| ready(event.severity == AlertSeverity::Critical))
    }

    /// Periodic snapshot of the latest-value cache: every heartbeat tick
    /// scans the `monitoring:metric:` keyspace and emits each entry. A
    /// slow subscriber only ever needs the newest snapshot, so there is
    /// nothing to buffer beyond the current tick.
    pub fn latest_metrics(
        &self,
        service: Option<String>,
    ) -> impl Stream<Item = MetricEvent> + Send {
        let cache = self.cache.clone();
        IntervalStream::new(tokio::time::interval(self.heartbeat_interval))
            .then(move |_| {
                let cache = cache.clone();
                let service = service.clone();
                async move { stream::iter(cache.scan_latest_metrics(service.as_deref()).await) }
            })
            .flatten()
    }

    /// Live stream merged with the periodic cache snapshot, deduplicated
    /// by `(service, metricType)` across the interleave: the same sample
    /// reaching a subscriber via both the live push and a snapshot tick
    /// is delivered once, while a new reading for the key always passes.
    pub fn combined_metrics(
        &self,
        service: Option<String>,
    ) -> impl Stream<Item = MetricEvent> + Send {
        let live = self.subscribe_metrics(service.clone());
        let snapshots = self.latest_metrics(service);
        // Last delivered sample identity per key. Snapshot ticks re-emit
        // the cached sample until a newer one replaces it, so the entry
        // must persist for the key, not expire with time.
        let mut delivered: HashMap<String, (NaiveDateTime, f64)> = HashMap::new();
        stream::select(live, snapshots).filter(move |event| {
            let key = format!("{}:{}", event.service_name, event.metric_type);
            let identity = (event.timestamp, event.metric_value);
            let fresh = delivered.get(&key) != Some(&identity);
            if fresh {
                delivered.insert(key, identity);
            }
            ready(fresh)
        })
    }
}

/// Drops lag notifications from a broadcast receiver: a subscriber that
/// fell behind simply loses the oldest undelivered items.
fn filter_lagged<T: Clone + Send + 'static>(
    stream: BroadcastStream<T>,
) -> impl Stream<Item = T> + Send {
    stream.filter_map(|item| {
        ready(match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(dropped)) => {
                tracing::warn!(dropped, "Slow subscriber dropped oldest buffered events");
                None
            }
        })
    })
}

/// Shared upstream consumer for one topic: decodes records into the
/// broadcast channel, dropping whatever fails to decode, and re-subscribes
/// with backoff after any consumer error.
async fn pump<T>(
    bus: Arc<dyn MessageBus>,
    topic: String,
    group: String,
    tx: broadcast::Sender<T>,
) where
    T: DeserializeOwned + Clone + Send + 'static,
{
    loop {
        let mut subscription = match bus
            .subscribe(&topic, &group, OffsetReset::Latest)
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Stream subscribe failed, retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        tracing::info!(topic = %topic, group = %group, "Shared stream started");

        loop {
            match subscription.next().await {
                Ok(record) => {
                    match std::str::from_utf8(&record.payload)
                        .ok()
                        .and_then(|json| codec::decode::<T>(json).ok())
                    {
                        Some(event) => {
                            // No receivers is fine; dashboards come and go.
                            let _ = tx.send(event);
                        }
                        None => {
                            tracing::warn!(
                                topic = %topic,
                                offset = record.offset,
                                "Dropping undecodable record"
                            );
                        }
                    }
                    let _ = subscription.ack(&record).await;
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Stream consumer error, re-subscribing");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    break;
                }
            }
        }
    }
}
