use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{self, AppState};
use crate::logging;
use crate::ratelimit::{self, RateLimiter};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pulsemon ingestion API",
        description = "Metric submission endpoint of the monitoring pipeline",
    ),
    tags(
        (name = "Metrics", description = "Metric ingestion"),
        (name = "Health", description = "Service liveness")
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let (router, api_spec) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(api::ingest_metric))
        .routes(routes!(api::ingest_metric_batch))
        .routes(routes!(api::health))
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(middleware::from_fn_with_state(
            limiter,
            ratelimit::rate_limit,
        ))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", api_spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
