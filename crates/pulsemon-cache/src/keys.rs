//! Key namespace of the shared cache. Every key is prefixed `monitoring:`.

/// Namespace prefix for all cache keys.
pub const KEY_PREFIX: &str = "monitoring:";

/// Latest metric value per `(service, metricType)`.
pub fn metric_key(service: &str, metric_type: &str) -> String {
    format!("{KEY_PREFIX}metric:{service}:{metric_type}")
}

/// Current alert state per `(service, alertType)`. Absence means no
/// active alert.
pub fn alert_state_key(service: &str, alert_type: &str) -> String {
    format!("{KEY_PREFIX}alert:state:{service}:{alert_type}")
}

/// First-violation timestamp while a rule's duration window is running.
pub fn pending_alert_key(service: &str, alert_type: &str) -> String {
    format!("{KEY_PREFIX}alert:pending:{service}:{alert_type}")
}

/// Aggregate statistics hash for a `(service, metricType, window)`.
pub fn stats_key(service: &str, metric_type: &str, window: &str) -> String {
    format!("{KEY_PREFIX}stats:{service}:{metric_type}:{window}")
}

/// Scan pattern over the latest-value keyspace, optionally scoped to one
/// service.
pub fn metric_scan_pattern(service: Option<&str>) -> String {
    match service {
        Some(service) => format!("{KEY_PREFIX}metric:{service}:*"),
        None => format!("{KEY_PREFIX}metric:*"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_namespace_prefix() {
        assert_eq!(metric_key("web", "CPU"), "monitoring:metric:web:CPU");
        assert_eq!(
            alert_state_key("web", "CPU_HIGH"),
            "monitoring:alert:state:web:CPU_HIGH"
        );
        assert_eq!(
            pending_alert_key("db", "MEMORY_CRITICAL"),
            "monitoring:alert:pending:db:MEMORY_CRITICAL"
        );
        assert_eq!(
            stats_key("web", "LATENCY", "1m"),
            "monitoring:stats:web:LATENCY:1m"
        );
    }

    #[test]
    fn scan_pattern_scopes_by_service() {
        assert_eq!(metric_scan_pattern(None), "monitoring:metric:*");
        assert_eq!(metric_scan_pattern(Some("web")), "monitoring:metric:web:*");
    }
}
