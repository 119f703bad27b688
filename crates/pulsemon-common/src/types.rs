use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::codec;

/// Kinds of metric a monitored service can report.
///
/// Wire form is the uppercase constant name (`"ERROR_RATE"`); every kind
/// carries a default unit used when the producer omits one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    Cpu,
    Memory,
    Latency,
    ErrorRate,
    Throughput,
    DiskIo,
    NetworkBandwidth,
    DbConnections,
    QueueDepth,
    CacheHitRate,
    HeapMemory,
    ThreadCount,
    GcTime,
    Custom,
}

impl MetricType {
    pub const ALL: [MetricType; 14] = [
        MetricType::Cpu,
        MetricType::Memory,
        MetricType::Latency,
        MetricType::ErrorRate,
        MetricType::Throughput,
        MetricType::DiskIo,
        MetricType::NetworkBandwidth,
        MetricType::DbConnections,
        MetricType::QueueDepth,
        MetricType::CacheHitRate,
        MetricType::HeapMemory,
        MetricType::ThreadCount,
        MetricType::GcTime,
        MetricType::Custom,
    ];

    /// The uppercase wire name (`"DISK_IO"`), also used in cache keys and
    /// derived alert types.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Cpu => "CPU",
            MetricType::Memory => "MEMORY",
            MetricType::Latency => "LATENCY",
            MetricType::ErrorRate => "ERROR_RATE",
            MetricType::Throughput => "THROUGHPUT",
            MetricType::DiskIo => "DISK_IO",
            MetricType::NetworkBandwidth => "NETWORK_BANDWIDTH",
            MetricType::DbConnections => "DB_CONNECTIONS",
            MetricType::QueueDepth => "QUEUE_DEPTH",
            MetricType::CacheHitRate => "CACHE_HIT_RATE",
            MetricType::HeapMemory => "HEAP_MEMORY",
            MetricType::ThreadCount => "THREAD_COUNT",
            MetricType::GcTime => "GC_TIME",
            MetricType::Custom => "CUSTOM",
        }
    }

    /// Lowercase code accepted from ingestion requests (`"error_rate"`).
    pub fn code(&self) -> &'static str {
        match self {
            MetricType::Cpu => "cpu",
            MetricType::Memory => "memory",
            MetricType::Latency => "latency",
            MetricType::ErrorRate => "error_rate",
            MetricType::Throughput => "throughput",
            MetricType::DiskIo => "disk_io",
            MetricType::NetworkBandwidth => "network_bandwidth",
            MetricType::DbConnections => "db_connections",
            MetricType::QueueDepth => "queue_depth",
            MetricType::CacheHitRate => "cache_hit_rate",
            MetricType::HeapMemory => "heap_memory",
            MetricType::ThreadCount => "thread_count",
            MetricType::GcTime => "gc_time",
            MetricType::Custom => "custom",
        }
    }

    /// Default unit applied when a producer does not set one.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricType::Cpu => "percent",
            MetricType::Memory => "percent",
            MetricType::Latency => "milliseconds",
            MetricType::ErrorRate => "percent",
            MetricType::Throughput => "requests_per_second",
            MetricType::DiskIo => "operations_per_second",
            MetricType::NetworkBandwidth => "megabytes_per_second",
            MetricType::DbConnections => "count",
            MetricType::QueueDepth => "count",
            MetricType::CacheHitRate => "percent",
            MetricType::HeapMemory => "megabytes",
            MetricType::ThreadCount => "count",
            MetricType::GcTime => "milliseconds",
            MetricType::Custom => "custom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MetricType::Cpu => "CPU Utilization",
            MetricType::Memory => "Memory Utilization",
            MetricType::Latency => "Response Latency",
            MetricType::ErrorRate => "Error Rate",
            MetricType::Throughput => "Request Throughput",
            MetricType::DiskIo => "Disk I/O",
            MetricType::NetworkBandwidth => "Network Bandwidth",
            MetricType::DbConnections => "Database Connections",
            MetricType::QueueDepth => "Queue Depth",
            MetricType::CacheHitRate => "Cache Hit Rate",
            MetricType::HeapMemory => "Heap Memory",
            MetricType::ThreadCount => "Thread Count",
            MetricType::GcTime => "GC Time",
            MetricType::Custom => "Custom Metric",
        }
    }

    /// Looks a metric type up by its lowercase code or wire name,
    /// case-insensitively.
    pub fn from_code(code: &str) -> Option<MetricType> {
        MetricType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(code) || t.as_str().eq_ignore_ascii_case(code))
    }

    /// Percentage-family metrics are additionally bounded to [0, 100] at
    /// ingestion.
    pub fn is_percentage(&self) -> bool {
        self.unit().contains("percent") || self.as_str().contains("RATE")
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricType::from_code(s).ok_or_else(|| format!("unknown metric type: {s}"))
    }
}

/// Alert severity, ordered lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 4] = [
        AlertSeverity::Low,
        AlertSeverity::Medium,
        AlertSeverity::High,
        AlertSeverity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "Low",
            AlertSeverity::Medium => "Medium",
            AlertSeverity::High => "High",
            AlertSeverity::Critical => "Critical",
        }
    }

    /// Color used by dashboard and chat integrations.
    pub fn color_code(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "#3498db",
            AlertSeverity::Medium => "#f39c12",
            AlertSeverity::High => "#e67e22",
            AlertSeverity::Critical => "#e74c3c",
        }
    }

    pub fn from_code(code: &str) -> Option<AlertSeverity> {
        AlertSeverity::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertSeverity::from_code(s).ok_or_else(|| format!("unknown alert severity: {s}"))
    }
}

/// Lifecycle state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    AutoResolved,
    Suppressed,
    Pending,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::AutoResolved => "AUTO_RESOLVED",
            AlertStatus::Suppressed => "SUPPRESSED",
            AlertStatus::Pending => "PENDING",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::AutoResolved)
    }

    pub fn from_code(code: &str) -> Option<AlertStatus> {
        [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
            AlertStatus::AutoResolved,
            AlertStatus::Suppressed,
            AlertStatus::Pending,
        ]
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived alert scoping label: `<METRIC_TYPE>_<SEVERITY>` uppercased.
pub fn alert_type(metric_type: &str, severity: &str) -> String {
    format!("{}_{}", metric_type, severity).to_uppercase()
}

/// A single time-stamped measurement emitted by a monitored service.
///
/// Created by the ingestion publisher from a validated request and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub service_name: String,
    pub metric_type: MetricType,
    pub metric_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(with = "codec::datetime")]
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        default,
        with = "codec::datetime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl MetricEvent {
    /// Builds a minimal event stamped with the current time. Mostly used
    /// by tests and examples.
    pub fn now(service_name: &str, metric_type: MetricType, value: f64) -> Self {
        let ts = codec::now();
        Self {
            event_id: Some(uuid::Uuid::new_v4().to_string()),
            service_name: service_name.to_string(),
            metric_type,
            metric_value: value,
            unit: Some(metric_type.unit().to_string()),
            timestamp: ts,
            hostname: None,
            environment: None,
            version: None,
            created_at: Some(ts),
            tags: None,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }
}

/// A record of a rule violation, ACTIVE while the condition holds and
/// mutated exactly once on resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub alert_id: String,
    pub service_name: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(with = "codec::datetime")]
    pub triggered_at: NaiveDateTime,
    #[serde(
        default,
        with = "codec::datetime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(
        default,
        with = "codec::datetime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

impl AlertEvent {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Transitions the alert to RESOLVED in place. `alert_id` and
    /// `triggered_at` are preserved; `duration_seconds` is the floor of the
    /// active interval.
    pub fn resolve(&mut self, at: NaiveDateTime, current_value: f64) {
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(at);
        self.current_value = Some(current_value);
        self.duration_seconds = Some((at - self.triggered_at).num_seconds());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn full_metric_event() -> MetricEvent {
        let ts = codec::now();
        MetricEvent {
            event_id: Some("e-1".into()),
            service_name: "web".into(),
            metric_type: MetricType::DiskIo,
            metric_value: 42.5,
            unit: Some("operations_per_second".into()),
            timestamp: ts,
            hostname: Some("web-01".into()),
            environment: Some("production".into()),
            version: Some("1.2.3".into()),
            created_at: Some(ts),
            tags: Some(std::collections::HashMap::from([(
                "region".to_string(),
                "eu-west-1".to_string(),
            )])),
        }
    }

    #[test]
    fn metric_event_round_trips_with_all_fields() {
        let event = full_metric_event();
        let json = codec::encode(&event).unwrap();
        let back: MetricEvent = codec::decode(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn alert_event_round_trips_with_all_fields() {
        let ts = codec::now();
        let mut event = AlertEvent {
            alert_id: "a-1".into(),
            service_name: "db".into(),
            alert_type: "MEMORY_HIGH".into(),
            severity: AlertSeverity::High,
            status: AlertStatus::Active,
            message: "Memory Utilization GT threshold exceeded: current=92.00, threshold=85.00"
                .into(),
            description: Some("memory pressure".into()),
            threshold_value: Some(85.0),
            current_value: Some(92.0),
            triggered_at: ts,
            resolved_at: None,
            duration_seconds: None,
            hostname: Some("db-01".into()),
            environment: Some("staging".into()),
            metadata: Some(std::collections::HashMap::from([(
                "rule".to_string(),
                "high-memory-usage".to_string(),
            )])),
            created_at: Some(ts),
        };
        event.resolve(ts + chrono::Duration::seconds(61), 40.0);

        let json = codec::encode(&event).unwrap();
        let back: AlertEvent = codec::decode(&json).unwrap();
        assert_eq!(event, back);
        assert_eq!(back.duration_seconds, Some(61));
    }

    #[test]
    fn wire_enum_names_are_uppercase_constants() {
        let json = codec::encode(&MetricType::NetworkBandwidth).unwrap();
        assert_eq!(json, "\"NETWORK_BANDWIDTH\"");
        let json = codec::encode(&AlertStatus::AutoResolved).unwrap();
        assert_eq!(json, "\"AUTO_RESOLVED\"");
        let json = codec::encode(&AlertSeverity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn timestamps_use_second_resolution_local_format() {
        let event = full_metric_event();
        let json = codec::encode(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ts = value["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), 19);
        assert!(ts.contains('T'));
        assert!(!ts.ends_with('Z'));
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let json = r#"{
            "serviceName": "web",
            "metricType": "CPU",
            "metricValue": 10.0,
            "timestamp": "2025-06-01T12:00:00",
            "somethingNew": {"nested": true}
        }"#;
        let event: MetricEvent = codec::decode(json).unwrap();
        assert_eq!(event.service_name, "web");
        assert_eq!(event.metric_type, MetricType::Cpu);
        assert!(event.tags.is_none());
    }

    #[test]
    fn optional_maps_are_omitted_when_absent() {
        let mut event = full_metric_event();
        event.tags = None;
        let json = codec::encode(&event).unwrap();
        assert!(!json.contains("tags"));
    }

    #[test]
    fn metric_type_lookup_accepts_code_and_wire_name() {
        assert_eq!(MetricType::from_code("error_rate"), Some(MetricType::ErrorRate));
        assert_eq!(MetricType::from_code("ERROR_RATE"), Some(MetricType::ErrorRate));
        assert_eq!(MetricType::from_code("Cpu"), Some(MetricType::Cpu));
        assert_eq!(MetricType::from_code("bogus"), None);
    }

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
    }

    #[test]
    fn alert_type_label_is_uppercased() {
        assert_eq!(alert_type("CPU", "HIGH"), "CPU_HIGH");
        assert_eq!(alert_type("cache_hit_rate", "low"), "CACHE_HIT_RATE_LOW");
    }

    #[test]
    fn percentage_family_detection() {
        assert!(MetricType::Cpu.is_percentage());
        assert!(MetricType::ErrorRate.is_percentage());
        assert!(MetricType::CacheHitRate.is_percentage());
        assert!(!MetricType::Latency.is_percentage());
        assert!(!MetricType::QueueDepth.is_percentage());
    }
}
