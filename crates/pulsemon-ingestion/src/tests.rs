use crate::dto::{MetricBatchRequest, MetricRequest};
use crate::publisher::MetricsEventPublisher;
use crate::service::{IngestError, MetricsPublishService};
use crate::validator::MetricValidator;
use chrono::Duration;
use pulsemon_bus::memory::MemoryBus;
use pulsemon_common::codec;
use pulsemon_common::types::{MetricEvent, MetricType};
use std::sync::Arc;

fn validator() -> MetricValidator {
    MetricValidator::new(
        1_000_000.0,
        vec!["dev".into(), "staging".into(), "production".into()],
    )
}

fn request(service: &str, metric_type: &str, value: f64) -> MetricRequest {
    MetricRequest {
        service_name: service.to_string(),
        metric_type: metric_type.to_string(),
        metric_value: value,
        unit: None,
        timestamp: Some(codec::now()),
        hostname: None,
        environment: Some("production".to_string()),
        version: None,
        tags: None,
    }
}

fn service_over(bus: &MemoryBus) -> MetricsPublishService {
    MetricsPublishService::new(
        validator(),
        MetricsEventPublisher::new(Arc::new(bus.clone()), "metrics.raw".to_string()),
    )
}

#[test]
fn valid_request_resolves_its_metric_type() {
    assert_eq!(
        validator().validate(&request("web-api", "cpu", 55.0)).unwrap(),
        MetricType::Cpu
    );
    assert_eq!(
        validator().validate(&request("web-api", "DISK_IO", 120.0)).unwrap(),
        MetricType::DiskIo
    );
}

#[test]
fn service_name_format_is_enforced() {
    let v = validator();
    assert!(v.validate(&request("a", "cpu", 10.0)).is_err());
    assert!(v.validate(&request("bad name", "cpu", 10.0)).is_err());
    assert!(v.validate(&request("web/api", "cpu", 10.0)).is_err());
    assert!(v.validate(&request("Web.Api_01-x", "cpu", 10.0)).is_ok());
}

#[test]
fn value_bounds_are_enforced() {
    let v = validator();
    assert!(v.validate(&request("web", "queue_depth", -1.0)).is_err());
    assert!(v.validate(&request("web", "queue_depth", 2_000_000.0)).is_err());
    assert!(v.validate(&request("web", "queue_depth", f64::NAN)).is_err());
    assert!(v.validate(&request("web", "queue_depth", 500.0)).is_ok());
}

#[test]
fn percentage_metrics_are_bounded_to_100() {
    let v = validator();
    assert!(v.validate(&request("web", "cpu", 100.5)).is_err());
    assert!(v.validate(&request("web", "error_rate", 101.0)).is_err());
    assert!(v.validate(&request("web", "cpu", 100.0)).is_ok());
    // Non-percentage metrics may exceed 100.
    assert!(v.validate(&request("web", "latency", 1500.0)).is_ok());
}

#[test]
fn timestamps_must_be_recent() {
    let v = validator();

    let mut future = request("web", "cpu", 10.0);
    future.timestamp = Some(codec::now() + Duration::hours(2));
    assert!(v.validate(&future).is_err());

    let mut stale = request("web", "cpu", 10.0);
    stale.timestamp = Some(codec::now() - Duration::hours(25));
    assert!(v.validate(&stale).is_err());

    let mut recent = request("web", "cpu", 10.0);
    recent.timestamp = Some(codec::now() - Duration::hours(23));
    assert!(v.validate(&recent).is_ok());
}

#[test]
fn environment_whitelist_is_enforced() {
    let v = validator();
    let mut bad = request("web", "cpu", 10.0);
    bad.environment = Some("qa".to_string());
    assert!(v.validate(&bad).is_err());

    let mut mixed_case = request("web", "cpu", 10.0);
    mixed_case.environment = Some("Production".to_string());
    assert!(v.validate(&mixed_case).is_ok());
}

#[test]
fn all_violations_are_reported_together() {
    let errors = validator()
        .validate(&request("x", "bogus", -5.0))
        .unwrap_err();
    assert!(errors.len() >= 3, "expected multiple errors, got {errors:?}");
}

#[tokio::test]
async fn published_event_is_normalized() {
    let bus = MemoryBus::new();
    let service = service_over(&bus);

    let mut req = request("  Web-API  ", "cpu", 55.0);
    req.environment = Some("Production".to_string());
    service.publish_metric(&req).await.unwrap();

    let payloads = bus.payloads("metrics.raw");
    assert_eq!(payloads.len(), 1);
    let event: MetricEvent =
        codec::decode(std::str::from_utf8(&payloads[0]).unwrap()).unwrap();
    assert_eq!(event.service_name, "web-api");
    assert_eq!(event.metric_type, MetricType::Cpu);
    assert_eq!(event.unit.as_deref(), Some("percent"));
    assert_eq!(event.environment.as_deref(), Some("production"));
    assert!(event.event_id.is_some());
    assert!(event.created_at.is_some());
}

#[tokio::test]
async fn invalid_request_is_rejected_before_publish() {
    let bus = MemoryBus::new();
    let service = service_over(&bus);

    let result = service.publish_metric(&request("web", "cpu", 250.0)).await;
    assert!(matches!(result, Err(IngestError::Validation { .. })));
    assert!(bus.payloads("metrics.raw").is_empty());
}

#[tokio::test]
async fn batch_size_limits_are_enforced() {
    let bus = MemoryBus::new();
    let service = service_over(&bus);

    let empty = MetricBatchRequest {
        batch_id: None,
        metrics: vec![],
    };
    assert!(matches!(
        service.publish_batch(&empty).await,
        Err(IngestError::Validation { .. })
    ));

    let oversized = MetricBatchRequest {
        batch_id: None,
        metrics: (0..101).map(|_| request("web", "cpu", 10.0)).collect(),
    };
    assert!(matches!(
        service.publish_batch(&oversized).await,
        Err(IngestError::Validation { .. })
    ));
}

#[tokio::test]
async fn batch_errors_name_the_offending_index() {
    let bus = MemoryBus::new();
    let service = service_over(&bus);

    let batch = MetricBatchRequest {
        batch_id: Some("batch-1".to_string()),
        metrics: vec![request("web", "cpu", 10.0), request("web", "cpu", 500.0)],
    };
    let Err(IngestError::Validation { errors }) = service.publish_batch(&batch).await else {
        panic!("expected validation failure");
    };
    assert!(errors.iter().any(|e| e.starts_with("metrics[1]:")));
    // Nothing from a failed batch reaches the topic.
    assert!(bus.payloads("metrics.raw").is_empty());
}

#[tokio::test]
async fn batch_publishes_every_metric() {
    let bus = MemoryBus::new();
    let service = service_over(&bus);

    let batch = MetricBatchRequest {
        batch_id: None,
        metrics: vec![
            request("web", "cpu", 10.0),
            request("web", "memory", 20.0),
            request("db", "latency", 300.0),
        ],
    };
    assert_eq!(service.publish_batch(&batch).await.unwrap(), 3);
    assert_eq!(bus.payloads("metrics.raw").len(), 3);
}
