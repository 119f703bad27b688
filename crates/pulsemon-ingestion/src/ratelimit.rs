use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::dto::ApiResponse;

/// Fixed-window per-client-IP request limiter for the ingestion surface.
pub struct RateLimiter {
    max_per_second: u32,
    windows: Mutex<HashMap<IpAddr, (u64, u32)>>,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a request from `ip` fits the current one-second window.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        // Entries from past windows are stale; dropping them keeps the map
        // bounded by the number of currently-active clients.
        windows.retain(|_, (window, _)| *window == now);

        let (_, count) = windows.entry(ip).or_insert((now, 0));
        if *count >= self.max_per_second {
            return false;
        }
        *count += 1;
        true
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.check(addr.ip()) {
        tracing::warn!(client = %addr.ip(), "Request rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::failure("Too many requests", Vec::new())),
        )
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn allows_up_to_the_limit_per_ip() {
        let limiter = RateLimiter::new(3);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(!limiter.check(ip));

        // Another client has its own window.
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        assert!(limiter.check(other));
    }
}
