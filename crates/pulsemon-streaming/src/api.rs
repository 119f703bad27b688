use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use futures::future::ready;
use pulsemon_common::codec;
use pulsemon_common::types::{AlertEvent, AlertStatus, MetricEvent};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::IntervalStream;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    #[serde(rename = "serviceName")]
    pub service_name: Option<String>,
}

fn metric_event(event: MetricEvent) -> Result<Event, Infallible> {
    sse_event(
        event.event_id.clone().unwrap_or_default(),
        "metric",
        &event,
    )
}

fn latest_metric_event(event: MetricEvent) -> Result<Event, Infallible> {
    sse_event(
        event.event_id.clone().unwrap_or_default(),
        "latest-metric",
        &event,
    )
}

/// SSE event name derived from the alert's lifecycle state, so clients
/// can handle triggers and resolutions differently.
pub(crate) fn alert_event_name(alert: &AlertEvent) -> &'static str {
    match alert.status {
        AlertStatus::Active => "alert-triggered",
        AlertStatus::Resolved | AlertStatus::AutoResolved => "alert-resolved",
        AlertStatus::Acknowledged => "alert-acknowledged",
        _ => "alert-update",
    }
}

fn alert_event(alert: AlertEvent) -> Result<Event, Infallible> {
    let name = alert_event_name(&alert);
    sse_event(alert.alert_id.clone(), name, &alert)
}

fn sse_event<T: serde::Serialize>(id: String, name: &str, payload: &T) -> Result<Event, Infallible> {
    Ok(Event::default()
        .id(id)
        .event(name)
        .data(codec::encode(payload).unwrap_or_default()))
}

/// GET /api/stream/metrics: every metric, all services.
pub async fn stream_all_metrics(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("Client connected to metrics stream (all services)");
    let stream = state.hub.subscribe_metrics(None).map(metric_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/metrics/{service}: metrics for one service.
pub async fn stream_service_metrics(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(service = %service, "Client connected to service metrics stream");
    let stream = state.hub.subscribe_metrics(Some(service)).map(metric_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/metrics/latest: periodic latest-value snapshots from
/// the cache rather than every individual metric.
pub async fn stream_latest_metrics(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(
        service = query.service_name.as_deref().unwrap_or("*"),
        "Client connected to latest metrics stream"
    );
    let stream = state
        .hub
        .latest_metrics(query.service_name)
        .map(latest_metric_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/metrics/heartbeat: liveness ticks for connection
/// monitoring.
pub async fn heartbeat(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.hub.heartbeat_interval());
    let stream = IntervalStream::new(interval)
        .map(|_| Ok(Event::default().event("heartbeat").data("alive")));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/alerts: every alert, all services.
pub async fn stream_all_alerts(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("Client connected to alerts stream (all services)");
    let stream = state.hub.subscribe_alerts(None).map(alert_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/alerts/{service}: alerts for one service.
pub async fn stream_service_alerts(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(service = %service, "Client connected to service alerts stream");
    let stream = state.hub.subscribe_alerts(Some(service)).map(alert_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/alerts/active: only alerts that are currently firing.
pub async fn stream_active_alerts(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(
        service = query.service_name.as_deref().unwrap_or("*"),
        "Client connected to active alerts stream"
    );
    let stream = state
        .hub
        .subscribe_alerts(query.service_name)
        .filter(|alert| ready(alert.status == AlertStatus::Active))
        .map(|alert| sse_event(alert.alert_id.clone(), "alert-active", &alert));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/stream/alerts/critical: escalation stream, CRITICAL only.
pub async fn stream_critical_alerts(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("Client connected to critical alerts stream");
    let stream = state
        .hub
        .subscribe_critical_alerts()
        .map(|alert| sse_event(alert.alert_id.clone(), "alert-critical", &alert));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
