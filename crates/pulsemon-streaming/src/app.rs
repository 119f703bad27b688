use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::hub::StreamHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<StreamHub>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/stream/metrics", get(api::stream_all_metrics))
        .route("/api/stream/metrics/latest", get(api::stream_latest_metrics))
        .route("/api/stream/metrics/heartbeat", get(api::heartbeat))
        .route("/api/stream/metrics/:service", get(api::stream_service_metrics))
        .route("/api/stream/alerts", get(api::stream_all_alerts))
        .route("/api/stream/alerts/active", get(api::stream_active_alerts))
        .route("/api/stream/alerts/critical", get(api::stream_critical_alerts))
        .route("/api/stream/alerts/:service", get(api::stream_service_alerts))
        .with_state(state)
        .layer(cors)
}
