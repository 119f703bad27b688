use anyhow::Result;
use pulsemon_storage::{MonitorStore, NewAlertRule};

fn default_rules() -> Vec<NewAlertRule> {
    let rule = |name: &str,
                metric: &str,
                operator: &str,
                threshold: f64,
                duration_minutes: i32,
                severity: &str,
                description: &str| NewAlertRule {
        rule_name: name.to_string(),
        service_name: "*".to_string(),
        metric_type: metric.to_string(),
        threshold_value: threshold,
        comparison_operator: operator.to_string(),
        duration_minutes,
        severity: severity.to_string(),
        enabled: true,
        description: Some(description.to_string()),
    };

    vec![
        rule(
            "high-cpu-usage",
            "CPU",
            "GT",
            80.0,
            5,
            "HIGH",
            "CPU utilization sustained above 80%",
        ),
        rule(
            "high-memory-usage",
            "MEMORY",
            "GT",
            85.0,
            2,
            "HIGH",
            "Memory utilization sustained above 85%",
        ),
        rule(
            "high-latency",
            "LATENCY",
            "GT",
            1000.0,
            3,
            "MEDIUM",
            "Response latency sustained above 1000ms",
        ),
        rule(
            "elevated-error-rate",
            "ERROR_RATE",
            "GT",
            5.0,
            2,
            "CRITICAL",
            "Error rate sustained above 5%",
        ),
    ]
}

/// Seeds the default alert rules, only when the table is empty so
/// operator edits survive restarts.
pub async fn init_default_rules(store: &MonitorStore) -> Result<()> {
    let existing = store.count_rules().await?;
    if existing > 0 {
        tracing::debug!(existing, "Alert rules already provisioned, skipping seed");
        return Ok(());
    }

    let mut created = 0u32;
    for rule in default_rules() {
        match store.insert_rule(&rule).await {
            Ok(inserted) => {
                tracing::info!(name = %inserted.rule_name, id = inserted.id, "Alert rule seeded");
                created += 1;
            }
            Err(e) => {
                tracing::error!(name = %rule.rule_name, error = %e, "Failed to seed alert rule");
            }
        }
    }
    tracing::info!(created, "Default alert rules seeded");
    Ok(())
}
