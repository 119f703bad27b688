use crate::api::alert_event_name;
use crate::hub::StreamHub;
use futures::stream::StreamExt;
use pulsemon_bus::memory::MemoryBus;
use pulsemon_bus::MessageBus;
use pulsemon_cache::memory::InMemoryMetricsCache;
use pulsemon_cache::MetricsCache;
use pulsemon_common::codec;
use pulsemon_common::types::{
    AlertEvent, AlertSeverity, AlertStatus, MetricEvent, MetricType,
};
use std::sync::Arc;
use std::time::Duration;

async fn started_hub(
    buffer_size: usize,
    heartbeat: Duration,
) -> (Arc<StreamHub>, MemoryBus, Arc<InMemoryMetricsCache>) {
    let bus = MemoryBus::new();
    let cache = Arc::new(InMemoryMetricsCache::new());
    let hub = Arc::new(StreamHub::new(cache.clone(), buffer_size, heartbeat));
    hub.start(
        Arc::new(bus.clone()),
        "metrics.raw".to_string(),
        "alerts".to_string(),
    );
    // Let the pump tasks establish their latest-offset subscriptions.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (hub, bus, cache)
}

async fn publish_metric(bus: &MemoryBus, event: &MetricEvent) {
    bus.publish(
        "metrics.raw",
        &event.service_name,
        codec::encode(event).unwrap().as_bytes(),
    )
    .await
    .unwrap();
}

async fn publish_alert(bus: &MemoryBus, alert: &AlertEvent) {
    bus.publish(
        "alerts",
        &alert.service_name,
        codec::encode(alert).unwrap().as_bytes(),
    )
    .await
    .unwrap();
}

fn alert(service: &str, severity: AlertSeverity, status: AlertStatus) -> AlertEvent {
    AlertEvent {
        alert_id: uuid_like(service, severity),
        service_name: service.to_string(),
        alert_type: format!("CPU_{severity}"),
        severity,
        status,
        message: "CPU Utilization GT threshold exceeded: current=92.00, threshold=80.00".into(),
        description: None,
        threshold_value: Some(80.0),
        current_value: Some(92.0),
        triggered_at: codec::now(),
        resolved_at: None,
        duration_seconds: None,
        hostname: None,
        environment: None,
        metadata: None,
        created_at: Some(codec::now()),
    }
}

fn uuid_like(service: &str, severity: AlertSeverity) -> String {
    format!("{service}-{severity}")
}

async fn recv<T>(
    stream: &mut (impl futures::Stream<Item = T> + Unpin),
) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .ok()
        .flatten()
}

async fn expect_silent_for<T>(
    stream: &mut (impl futures::Stream<Item = T> + Unpin),
    window: Duration,
) {
    assert!(
        tokio::time::timeout(window, stream.next()).await.is_err(),
        "stream unexpectedly produced an item"
    );
}

async fn expect_silent<T>(stream: &mut (impl futures::Stream<Item = T> + Unpin)) {
    expect_silent_for(stream, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn service_filter_applies_per_subscriber() {
    let (hub, bus, _) = started_hub(16, Duration::from_secs(600)).await;

    let mut unfiltered_a = Box::pin(hub.subscribe_metrics(None));
    let mut unfiltered_b = Box::pin(hub.subscribe_metrics(None));
    let mut web_only = Box::pin(hub.subscribe_metrics(Some("web".to_string())));

    publish_metric(&bus, &MetricEvent::now("db", MetricType::Cpu, 42.0)).await;

    assert_eq!(recv(&mut unfiltered_a).await.unwrap().service_name, "db");
    assert_eq!(recv(&mut unfiltered_b).await.unwrap().service_name, "db");
    expect_silent(&mut web_only).await;

    publish_metric(&bus, &MetricEvent::now("web", MetricType::Cpu, 10.0)).await;
    assert_eq!(recv(&mut web_only).await.unwrap().service_name, "web");
}

#[tokio::test]
async fn undecodable_records_are_dropped_with_the_stream_intact() {
    let (hub, bus, _) = started_hub(16, Duration::from_secs(600)).await;
    let mut metrics = Box::pin(hub.subscribe_metrics(None));

    bus.publish("metrics.raw", "web", b"{not json").await.unwrap();
    publish_metric(&bus, &MetricEvent::now("web", MetricType::Memory, 63.0)).await;

    let event = recv(&mut metrics).await.unwrap();
    assert_eq!(event.metric_type, MetricType::Memory);
}

#[tokio::test]
async fn critical_stream_filters_by_severity() {
    let (hub, bus, _) = started_hub(16, Duration::from_secs(600)).await;
    let mut critical = Box::pin(hub.subscribe_critical_alerts());

    publish_alert(&bus, &alert("web", AlertSeverity::High, AlertStatus::Active)).await;
    publish_alert(&bus, &alert("web", AlertSeverity::Critical, AlertStatus::Active)).await;

    let received = recv(&mut critical).await.unwrap();
    assert_eq!(received.severity, AlertSeverity::Critical);
    expect_silent(&mut critical).await;
}

#[tokio::test]
async fn latest_metrics_emits_cache_snapshots_on_each_tick() {
    let (hub, _, cache) = started_hub(16, Duration::from_millis(50)).await;
    cache
        .cache_latest_metric(&MetricEvent::now("web", MetricType::Cpu, 10.0))
        .await;
    cache
        .cache_latest_metric(&MetricEvent::now("db", MetricType::Memory, 20.0))
        .await;

    let mut latest = Box::pin(hub.latest_metrics(None));
    let first = recv(&mut latest).await.unwrap();
    let second = recv(&mut latest).await.unwrap();
    let services: Vec<String> = vec![first.service_name, second.service_name];
    assert!(services.contains(&"web".to_string()));
    assert!(services.contains(&"db".to_string()));

    let mut web_only = Box::pin(hub.latest_metrics(Some("web".to_string())));
    assert_eq!(recv(&mut web_only).await.unwrap().service_name, "web");
}

#[tokio::test]
async fn combined_stream_delivers_each_sample_once() {
    let (hub, bus, cache) = started_hub(16, Duration::from_millis(100)).await;

    // The sample is already in the latest-value cache (the aggregator put
    // it there) and also arrives on the live stream: one delivery total,
    // no matter how many snapshot ticks re-read it.
    let cpu = MetricEvent::now("web", MetricType::Cpu, 10.0);
    cache.cache_latest_metric(&cpu).await;
    let mut combined = Box::pin(hub.combined_metrics(None));
    publish_metric(&bus, &cpu).await;

    let first = recv(&mut combined).await.unwrap();
    assert_eq!(first.metric_type, MetricType::Cpu);
    assert_eq!(first.metric_value, 10.0);
    expect_silent_for(&mut combined, Duration::from_millis(350)).await;

    // A new reading for the same (service, metricType) surfaces.
    let newer = MetricEvent::now("web", MetricType::Cpu, 11.0);
    cache.cache_latest_metric(&newer).await;
    publish_metric(&bus, &newer).await;
    let second = recv(&mut combined).await.unwrap();
    assert_eq!(second.metric_value, 11.0);
    expect_silent_for(&mut combined, Duration::from_millis(350)).await;

    // Other keys are independent.
    publish_metric(&bus, &MetricEvent::now("web", MetricType::Memory, 12.0)).await;
    let third = recv(&mut combined).await.unwrap();
    assert_eq!(third.metric_type, MetricType::Memory);
}

#[test]
fn alert_event_names_follow_lifecycle_state() {
    let active = alert("web", AlertSeverity::High, AlertStatus::Active);
    assert_eq!(alert_event_name(&active), "alert-triggered");

    let resolved = alert("web", AlertSeverity::High, AlertStatus::Resolved);
    assert_eq!(alert_event_name(&resolved), "alert-resolved");

    let auto = alert("web", AlertSeverity::High, AlertStatus::AutoResolved);
    assert_eq!(alert_event_name(&auto), "alert-resolved");

    let acked = alert("web", AlertSeverity::High, AlertStatus::Acknowledged);
    assert_eq!(alert_event_name(&acked), "alert-acknowledged");

    let suppressed = alert("web", AlertSeverity::High, AlertStatus::Suppressed);
    assert_eq!(alert_event_name(&suppressed), "alert-update");
}
