use chrono::{Duration, NaiveDateTime};
use pulsemon_common::codec;
use pulsemon_common::types::AlertEvent;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub enabled: bool,
    pub max_notifications_per_hour: u32,
    pub duplicate_suppression_minutes: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_notifications_per_hour: 10,
            duplicate_suppression_minutes: 5,
        }
    }
}

/// Process-local notification throttle.
///
/// Two independent checks run in order: a duplicate window per
/// `(service, alertType)` and an hourly rate limit per service. A
/// notification that passes both is recorded, which also sweeps entries
/// older than two hours and hour counters outside the current hour.
pub struct NotificationThrottler {
    config: ThrottleConfig,
    recent: Mutex<HashMap<String, NaiveDateTime>>,
    hourly: Mutex<HashMap<String, u32>>,
}

impl NotificationThrottler {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            recent: Mutex::new(HashMap::new()),
            hourly: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` when the notification should be suppressed.
    pub fn should_throttle(&self, alert: &AlertEvent) -> bool {
        self.should_throttle_at(alert, codec::now())
    }

    /// Clock-injected variant backing `should_throttle`.
    pub fn should_throttle_at(&self, alert: &AlertEvent, now: NaiveDateTime) -> bool {
        if !self.config.enabled {
            return false;
        }

        let key = duplicate_key(alert);
        if self.is_duplicate(&key, now) {
            tracing::debug!(
                service = %alert.service_name,
                alert_type = %alert.alert_type,
                "Notification suppressed (duplicate)"
            );
            return true;
        }

        if self.is_rate_limited(&alert.service_name, now) {
            tracing::warn!(
                service = %alert.service_name,
                "Notification suppressed (rate limited)"
            );
            return true;
        }

        self.record(key, &alert.service_name, now);
        false
    }

    fn is_duplicate(&self, key: &str, now: NaiveDateTime) -> bool {
        let recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
        let cutoff = now - Duration::minutes(self.config.duplicate_suppression_minutes);
        recent.get(key).is_some_and(|last| *last > cutoff)
    }

    fn is_rate_limited(&self, service: &str, now: NaiveDateTime) -> bool {
        let hourly = self.hourly.lock().unwrap_or_else(|p| p.into_inner());
        let count = hourly.get(&hour_key(service, now)).copied().unwrap_or(0);
        count >= self.config.max_notifications_per_hour
    }

    fn record(&self, key: String, service: &str, now: NaiveDateTime) {
        {
            let mut recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
            recent.insert(key, now);
            let cutoff = now - Duration::hours(2);
            recent.retain(|_, last| *last >= cutoff);
        }
        {
            let mut hourly = self.hourly.lock().unwrap_or_else(|p| p.into_inner());
            *hourly.entry(hour_key(service, now)).or_insert(0) += 1;
            let current_suffix = hour_suffix(now);
            hourly.retain(|key, _| key.ends_with(&current_suffix));
        }
    }
}

fn duplicate_key(alert: &AlertEvent) -> String {
    format!("{}:{}", alert.service_name, alert.alert_type)
}

fn hour_suffix(now: NaiveDateTime) -> String {
    now.format(":%Y-%m-%dT%H").to_string()
}

fn hour_key(service: &str, now: NaiveDateTime) -> String {
    format!("{service}{}", hour_suffix(now))
}
