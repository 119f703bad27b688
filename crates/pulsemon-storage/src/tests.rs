use crate::store::MonitorStore;
use crate::{AlertHistoryStore, AlertRuleStore, MetricHistoryStore, NewAlertRule};
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertSeverity, AlertStatus, MetricEvent, MetricType};

async fn store() -> MonitorStore {
    MonitorStore::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}

fn rule(name: &str, service: &str, metric: &str, threshold: f64, severity: &str) -> NewAlertRule {
    NewAlertRule {
        rule_name: name.to_string(),
        service_name: service.to_string(),
        metric_type: metric.to_string(),
        threshold_value: threshold,
        comparison_operator: "GT".to_string(),
        duration_minutes: 0,
        severity: severity.to_string(),
        enabled: true,
        description: None,
    }
}

fn active_alert(alert_id: &str) -> AlertEvent {
    AlertEvent {
        alert_id: alert_id.to_string(),
        service_name: "web".into(),
        alert_type: "CPU_HIGH".into(),
        severity: AlertSeverity::High,
        status: AlertStatus::Active,
        message: "CPU Utilization GT threshold exceeded: current=92.00, threshold=80.00".into(),
        description: None,
        threshold_value: Some(80.0),
        current_value: Some(92.0),
        triggered_at: codec::now(),
        resolved_at: None,
        duration_seconds: None,
        hostname: Some("web-01".into()),
        environment: Some("production".into()),
        metadata: None,
        created_at: Some(codec::now()),
    }
}

#[tokio::test]
async fn metric_rows_append_with_tags_as_json() {
    let store = store().await;
    let mut event = MetricEvent::now("web", MetricType::Cpu, 42.0);
    event.tags = Some(std::collections::HashMap::from([(
        "region".to_string(),
        "eu-west-1".to_string(),
    )]));

    let first = store.append_metric(&event).await.unwrap();
    let second = store.append_metric(&event).await.unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn alert_append_is_idempotent_on_alert_id() {
    let store = store().await;
    let alert = active_alert(&uuid::Uuid::new_v4().to_string());

    store.append_alert(&alert).await.unwrap();
    // Redelivery persists the same alert id again; treated as success.
    store.append_alert(&alert).await.unwrap();
}

#[tokio::test]
async fn resolve_updates_the_single_matching_row() {
    let store = store().await;
    let mut alert = active_alert(&uuid::Uuid::new_v4().to_string());
    store.append_alert(&alert).await.unwrap();

    alert.resolve(alert.triggered_at + chrono::Duration::seconds(90), 12.0);
    assert!(store.mark_resolved(&alert).await.unwrap());

    // A second resolution attempt still finds the row; it is an update,
    // not an append.
    assert!(store.mark_resolved(&alert).await.unwrap());
}

#[tokio::test]
async fn resolve_of_unknown_alert_reports_no_row() {
    let store = store().await;
    let mut alert = active_alert("never-persisted");
    alert.resolve(alert.triggered_at + chrono::Duration::seconds(5), 1.0);
    assert!(!store.mark_resolved(&alert).await.unwrap());
}

#[tokio::test]
async fn find_applicable_matches_service_and_wildcard() {
    let store = store().await;
    store.insert_rule(&rule("wildcard-cpu", "*", "CPU", 80.0, "HIGH")).await.unwrap();
    store.insert_rule(&rule("web-cpu", "web", "CPU", 90.0, "CRITICAL")).await.unwrap();
    store.insert_rule(&rule("web-memory", "web", "MEMORY", 85.0, "HIGH")).await.unwrap();
    store.insert_rule(&rule("db-cpu", "db", "CPU", 70.0, "MEDIUM")).await.unwrap();

    let rules = store.find_applicable("web", "CPU").await.unwrap();
    let names: Vec<&str> = rules.iter().map(|r| r.rule_name.as_str()).collect();
    assert_eq!(names, vec!["web-cpu", "wildcard-cpu"]);
}

#[tokio::test]
async fn find_applicable_orders_specific_before_wildcard() {
    let store = store().await;
    // Wildcard inserted first; specific rules must still sort ahead of it.
    store.insert_rule(&rule("any-memory", "*", "MEMORY", 85.0, "HIGH")).await.unwrap();
    store.insert_rule(&rule("db-memory-a", "db", "MEMORY", 90.0, "CRITICAL")).await.unwrap();
    store.insert_rule(&rule("db-memory-b", "db", "MEMORY", 95.0, "CRITICAL")).await.unwrap();

    let rules = store.find_applicable("db", "MEMORY").await.unwrap();
    let names: Vec<&str> = rules.iter().map(|r| r.rule_name.as_str()).collect();
    assert_eq!(names, vec!["db-memory-a", "db-memory-b", "any-memory"]);
}

#[tokio::test]
async fn find_applicable_skips_disabled_rules() {
    let store = store().await;
    let mut disabled = rule("disabled-cpu", "*", "CPU", 80.0, "HIGH");
    disabled.enabled = false;
    store.insert_rule(&disabled).await.unwrap();

    assert!(store.find_applicable("web", "CPU").await.unwrap().is_empty());
}
