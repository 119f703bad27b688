use chrono::Duration;
use pulsemon_common::codec;
use pulsemon_common::types::MetricType;

use crate::dto::MetricRequest;

/// Business-rule validation for metric submissions, beyond what the JSON
/// shape already enforces. All violations are collected into one list so
/// a client sees everything wrong with its request at once.
pub struct MetricValidator {
    max_metric_value: f64,
    allowed_environments: Vec<String>,
}

impl MetricValidator {
    pub fn new(max_metric_value: f64, allowed_environments: Vec<String>) -> Self {
        Self {
            max_metric_value,
            allowed_environments: allowed_environments
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Validates one request; on success returns the resolved metric
    /// type.
    pub fn validate(&self, request: &MetricRequest) -> Result<MetricType, Vec<String>> {
        let mut errors = Vec::new();

        let service = request.service_name.trim();
        if !valid_service_name(service) {
            errors.push(format!(
                "Invalid service name format: {}",
                request.service_name
            ));
        }

        let metric_type = MetricType::from_code(&request.metric_type);
        if metric_type.is_none() {
            errors.push(format!("Unknown metric type: {}", request.metric_type));
        }

        if !request.metric_value.is_finite() {
            errors.push("Metric value must be a finite number".to_string());
        } else {
            if request.metric_value < 0.0 {
                errors.push("Metric value cannot be negative".to_string());
            }
            if request.metric_value > self.max_metric_value {
                errors.push(format!(
                    "Metric value exceeds maximum allowed: {}",
                    self.max_metric_value
                ));
            }
        }

        if let Some(timestamp) = request.timestamp {
            let now = codec::now();
            if timestamp > now + Duration::hours(1) {
                errors.push("Timestamp cannot be more than 1 hour in the future".to_string());
            }
            if timestamp < now - Duration::hours(24) {
                errors.push("Timestamp is too old (more than 24 hours in the past)".to_string());
            }
        }

        if let Some(environment) = &request.environment {
            if !self.allowed_environments.contains(&environment.to_lowercase()) {
                errors.push(format!(
                    "Invalid environment. Allowed values: {}",
                    self.allowed_environments.join(", ")
                ));
            }
        }

        if let Some(metric_type) = metric_type {
            if metric_type.is_percentage()
                && !(0.0..=100.0).contains(&request.metric_value)
            {
                errors.push("Percentage metric must be between 0 and 100".to_string());
            }
        }

        match metric_type {
            Some(metric_type) if errors.is_empty() => Ok(metric_type),
            _ => {
                tracing::warn!(
                    service = %request.service_name,
                    metric_type = %request.metric_type,
                    ?errors,
                    "Metric validation failed"
                );
                Err(errors)
            }
        }
    }
}

fn valid_service_name(service: &str) -> bool {
    (2..=100).contains(&service.len())
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
