use crate::aggregator::MetricsAggregator;
use crate::consumer::MetricConsumer;
use crate::engine::AlertEngine;
use crate::publisher::AlertPublisher;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use pulsemon_bus::memory::MemoryBus;
use pulsemon_bus::MessageBus;
use pulsemon_cache::memory::InMemoryMetricsCache;
use pulsemon_cache::MetricsCache;
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertStatus, MetricEvent, MetricType};
use pulsemon_storage::error::Result as StorageResult;
use pulsemon_storage::{AlertHistoryStore, AlertRuleRow, AlertRuleStore, MetricHistoryStore};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MemoryRuleStore {
    rules: Vec<AlertRuleRow>,
}

#[async_trait]
impl AlertRuleStore for MemoryRuleStore {
    async fn find_applicable(
        &self,
        service: &str,
        metric_type: &str,
    ) -> StorageResult<Vec<AlertRuleRow>> {
        let mut rows: Vec<AlertRuleRow> = self
            .rules
            .iter()
            .filter(|r| {
                r.enabled
                    && r.metric_type == metric_type
                    && (r.service_name == service || r.service_name == "*")
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.is_wildcard(), r.id));
        Ok(rows)
    }
}

#[derive(Default)]
struct MemoryAlertStore {
    rows: Mutex<Vec<AlertEvent>>,
}

impl MemoryAlertStore {
    fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn status_of(&self, alert_id: &str) -> Option<AlertStatus> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.alert_id == alert_id)
            .map(|r| r.status)
    }
}

#[async_trait]
impl AlertHistoryStore for MemoryAlertStore {
    async fn append_alert(&self, alert: &AlertEvent) -> StorageResult<()> {
        let mut rows = self.rows.lock().unwrap();
        // Unique index on alert_id: a re-persist is a no-op success.
        if rows.iter().any(|r| r.alert_id == alert.alert_id) {
            return Ok(());
        }
        rows.push(alert.clone());
        Ok(())
    }

    async fn mark_resolved(&self, alert: &AlertEvent) -> StorageResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.alert_id == alert.alert_id) {
            Some(row) => {
                row.status = alert.status;
                row.resolved_at = alert.resolved_at;
                row.duration_seconds = alert.duration_seconds;
                row.current_value = alert.current_value;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct MemoryMetricStore {
    appended: AtomicI64,
}

#[async_trait]
impl MetricHistoryStore for MemoryMetricStore {
    async fn append_metric(&self, _event: &MetricEvent) -> StorageResult<i64> {
        Ok(self.appended.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn rule(
    id: i64,
    service: &str,
    metric: &str,
    operator: &str,
    threshold: f64,
    duration_minutes: i32,
    severity: &str,
) -> AlertRuleRow {
    AlertRuleRow {
        id,
        rule_name: format!("rule-{id}"),
        service_name: service.to_string(),
        metric_type: metric.to_string(),
        threshold_value: threshold,
        comparison_operator: operator.to_string(),
        duration_minutes,
        severity: severity.to_string(),
        enabled: true,
        description: None,
        created_at: codec::now(),
        updated_at: codec::now(),
    }
}

fn metric_at(
    service: &str,
    metric_type: MetricType,
    value: f64,
    timestamp: NaiveDateTime,
) -> MetricEvent {
    let mut event = MetricEvent::now(service, metric_type, value);
    event.timestamp = timestamp;
    event
}

struct Harness {
    bus: MemoryBus,
    cache: Arc<InMemoryMetricsCache>,
    alerts: Arc<MemoryAlertStore>,
    engine: Arc<AlertEngine>,
}

fn harness(rules: Vec<AlertRuleRow>) -> Harness {
    let bus = MemoryBus::new();
    let cache = Arc::new(InMemoryMetricsCache::new());
    let alerts = Arc::new(MemoryAlertStore::default());
    let publisher = AlertPublisher::new(Arc::new(bus.clone()), "alerts".to_string());
    let engine = Arc::new(AlertEngine::new(
        Arc::new(MemoryRuleStore { rules }),
        alerts.clone(),
        cache.clone(),
        publisher,
    ));
    Harness {
        bus,
        cache,
        alerts,
        engine,
    }
}

fn published_alerts(bus: &MemoryBus) -> Vec<AlertEvent> {
    bus.payloads("alerts")
        .iter()
        .map(|p| codec::decode(std::str::from_utf8(p).unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn trigger_then_resolve() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 0, "HIGH")]);
    let t = codec::now();

    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, t))
        .await
        .unwrap();

    let state = h.cache.alert_state("web", "CPU_HIGH").await.unwrap();
    assert!(state.is_active());

    let published = published_alerts(&h.bus);
    assert_eq!(published.len(), 1);
    let triggered = &published[0];
    assert_eq!(triggered.alert_type, "CPU_HIGH");
    assert_eq!(triggered.status, AlertStatus::Active);
    assert_eq!(triggered.current_value, Some(92.0));
    assert_eq!(triggered.threshold_value, Some(80.0));
    // The cached state is exactly what was published.
    assert_eq!(&state, triggered);

    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            10.0,
            t + chrono::Duration::seconds(1),
        ))
        .await
        .unwrap();

    assert!(h.cache.alert_state("web", "CPU_HIGH").await.is_none());

    let published = published_alerts(&h.bus);
    assert_eq!(published.len(), 2);
    let resolved = &published[1];
    assert_eq!(resolved.alert_id, triggered.alert_id);
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.current_value, Some(10.0));
    assert!(resolved.resolved_at.is_some());
    assert!(resolved.resolved_at.unwrap() >= resolved.triggered_at);
    assert!(resolved.duration_seconds.unwrap() >= 0);

    assert_eq!(
        h.alerts.status_of(&triggered.alert_id),
        Some(AlertStatus::Resolved)
    );
}

#[tokio::test]
async fn no_retrigger_while_active() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 0, "HIGH")]);
    let t = codec::now();

    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, t))
        .await
        .unwrap();
    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            95.0,
            t + chrono::Duration::seconds(1),
        ))
        .await
        .unwrap();

    assert_eq!(published_alerts(&h.bus).len(), 1);
    assert_eq!(h.alerts.row_count(), 1);
}

#[tokio::test]
async fn wildcard_and_specific_rules_fire_independently() {
    let h = harness(vec![
        rule(1, "*", "MEMORY", "GT", 85.0, 0, "HIGH"),
        rule(2, "db", "MEMORY", "GT", 90.0, 0, "CRITICAL"),
    ]);

    h.engine
        .evaluate_metric(&metric_at("db", MetricType::Memory, 92.0, codec::now()))
        .await
        .unwrap();

    let published = published_alerts(&h.bus);
    assert_eq!(published.len(), 2);
    // Specific rule evaluates first, then the wildcard.
    assert_eq!(published[0].alert_type, "MEMORY_CRITICAL");
    assert_eq!(published[1].alert_type, "MEMORY_HIGH");

    assert!(h.cache.alert_state("db", "MEMORY_CRITICAL").await.unwrap().is_active());
    assert!(h.cache.alert_state("db", "MEMORY_HIGH").await.unwrap().is_active());
}

#[tokio::test]
async fn redelivered_trigger_publishes_exactly_once() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 0, "HIGH")]);
    let event = metric_at("web", MetricType::Cpu, 92.0, codec::now());

    h.engine.evaluate_metric(&event).await.unwrap();
    // Same record delivered again: the cache already says ACTIVE.
    h.engine.evaluate_metric(&event).await.unwrap();

    assert_eq!(published_alerts(&h.bus).len(), 1);
    assert_eq!(h.alerts.row_count(), 1);
}

#[tokio::test]
async fn redelivered_resolve_is_a_noop() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 0, "HIGH")]);
    let t = codec::now();

    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, t))
        .await
        .unwrap();
    let resolve = metric_at("web", MetricType::Cpu, 10.0, t + chrono::Duration::seconds(1));
    h.engine.evaluate_metric(&resolve).await.unwrap();
    // Redelivery finds no cache entry and takes no action.
    h.engine.evaluate_metric(&resolve).await.unwrap();

    assert_eq!(published_alerts(&h.bus).len(), 2);
}

#[tokio::test]
async fn duration_window_gates_the_trigger() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 5, "HIGH")]);
    let t = codec::now();

    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, t))
        .await
        .unwrap();
    assert!(published_alerts(&h.bus).is_empty());
    assert_eq!(h.cache.pending_since("web", "CPU_HIGH").await, Some(t));

    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            95.0,
            t + chrono::Duration::minutes(2),
        ))
        .await
        .unwrap();
    assert!(published_alerts(&h.bus).is_empty());

    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            97.0,
            t + chrono::Duration::minutes(5),
        ))
        .await
        .unwrap();

    let published = published_alerts(&h.bus);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].status, AlertStatus::Active);
    // The pending marker is consumed by the trigger.
    assert!(h.cache.pending_since("web", "CPU_HIGH").await.is_none());
}

#[tokio::test]
async fn non_violating_sample_restarts_the_duration_window() {
    let h = harness(vec![rule(1, "*", "CPU", "GT", 80.0, 5, "HIGH")]);
    let t = codec::now();

    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, t))
        .await
        .unwrap();
    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            50.0,
            t + chrono::Duration::minutes(1),
        ))
        .await
        .unwrap();
    assert!(h.cache.pending_since("web", "CPU_HIGH").await.is_none());

    // A fresh violation run starts counting from scratch.
    let restart = t + chrono::Duration::minutes(4);
    h.engine
        .evaluate_metric(&metric_at("web", MetricType::Cpu, 92.0, restart))
        .await
        .unwrap();
    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            92.0,
            t + chrono::Duration::minutes(6),
        ))
        .await
        .unwrap();
    assert!(published_alerts(&h.bus).is_empty());

    h.engine
        .evaluate_metric(&metric_at(
            "web",
            MetricType::Cpu,
            92.0,
            restart + chrono::Duration::minutes(5),
        ))
        .await
        .unwrap();
    assert_eq!(published_alerts(&h.bus).len(), 1);
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn consumer_runs_both_tracks_and_acknowledges() {
    let bus = MemoryBus::new();
    let cache = Arc::new(InMemoryMetricsCache::new());
    let metrics = Arc::new(MemoryMetricStore::default());
    let alerts = Arc::new(MemoryAlertStore::default());
    let publisher = AlertPublisher::new(Arc::new(bus.clone()), "alerts".to_string());
    let engine = Arc::new(AlertEngine::new(
        Arc::new(MemoryRuleStore {
            rules: vec![rule(1, "*", "CPU", "GT", 80.0, 0, "HIGH")],
        }),
        alerts.clone(),
        cache.clone(),
        publisher,
    ));
    let aggregator = Arc::new(MetricsAggregator::new(cache.clone(), metrics.clone()));

    let consumer = MetricConsumer::new(
        Arc::new(bus.clone()),
        aggregator,
        engine,
        "metrics.raw".to_string(),
        "processing.metrics".to_string(),
    );
    let handle = tokio::spawn(async move {
        let _ = consumer.run().await;
    });

    // An undecodable record must not wedge the consumer.
    bus.publish("metrics.raw", "web", b"not-json").await.unwrap();

    let event = MetricEvent::now("web", MetricType::Cpu, 92.0);
    bus.publish(
        "metrics.raw",
        "web",
        codec::encode(&event).unwrap().as_bytes(),
    )
    .await
    .unwrap();

    let probe = bus.clone();
    wait_until(move || !probe.payloads("alerts").is_empty()).await;

    // Both tracks ran: history row appended, latest value cached, alert out.
    assert_eq!(metrics.appended.load(Ordering::SeqCst), 1);
    assert!(cache.latest_metric("web", "CPU").await.is_some());
    assert_eq!(published_alerts(&bus).len(), 1);

    handle.abort();
}
