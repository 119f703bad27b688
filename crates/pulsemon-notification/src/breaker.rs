use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Consecutive failures before a sink's breaker opens.
const FAILURE_THRESHOLD: u32 = 5;

/// How long an open breaker rejects sends before allowing a probe.
const OPEN_COOLDOWN: Duration = Duration::from_secs(60);

struct State {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker wrapped around one external notification sink. While
/// open, sends are dropped and logged instead of hammering a failing
/// integration.
pub struct Breaker {
    name: &'static str,
    state: Mutex<State>,
}

impl Breaker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether a send may go out: closed, or open long enough for a
    /// half-open probe.
    pub fn allow(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match state.opened_at {
            Some(opened_at) => opened_at.elapsed() >= OPEN_COOLDOWN,
            None => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.opened_at.is_some() {
            tracing::info!(channel = self.name, "Circuit breaker closed");
        }
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.consecutive_failures += 1;
        if state.consecutive_failures >= FAILURE_THRESHOLD && state.opened_at.is_none() {
            tracing::warn!(
                channel = self.name,
                failures = state.consecutive_failures,
                "Circuit breaker opened"
            );
            state.opened_at = Some(Instant::now());
        }
    }
}
