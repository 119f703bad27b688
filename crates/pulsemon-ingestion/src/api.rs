use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::dto::{ApiResponse, MetricBatchRequest, MetricRequest, ResponseMetadata};
use crate::service::{IngestError, MetricsPublishService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MetricsPublishService>,
}

fn metadata(processed: usize, start: Instant, request_id: &str) -> ResponseMetadata {
    ResponseMetadata {
        processed_count: processed,
        processing_time_ms: start.elapsed().as_millis(),
        request_id: request_id.to_string(),
    }
}

fn error_response(error: IngestError) -> (StatusCode, Json<ApiResponse>) {
    match error {
        IngestError::Validation { errors } => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure("Metric validation failed", errors)),
        ),
        IngestError::Publish(e) => {
            tracing::error!(error = %e, "Failed to publish metric");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure("Failed to accept metric", Vec::new())),
            )
        }
    }
}

/// Ingests a single metric.
#[utoipa::path(
    post,
    path = "/api/metrics",
    tag = "Metrics",
    request_body = MetricRequest,
    responses(
        (status = 202, description = "Metric accepted for processing", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 429, description = "Rate limited", body = ApiResponse)
    )
)]
pub async fn ingest_metric(
    State(state): State<AppState>,
    Json(request): Json<MetricRequest>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    tracing::debug!(
        service = %request.service_name,
        metric_type = %request.metric_type,
        request_id = %request_id,
        "Received metric ingestion request"
    );

    match state.service.publish_metric(&request).await {
        Ok(()) => {
            tracing::info!(
                service = %request.service_name,
                metric_type = %request.metric_type,
                duration_ms = start.elapsed().as_millis() as u64,
                "Metric ingested"
            );
            (
                StatusCode::ACCEPTED,
                Json(ApiResponse::accepted(
                    "Metric accepted for processing",
                    metadata(1, start, &request_id),
                )),
            )
        }
        Err(error) => error_response(error),
    }
}

/// Ingests a batch of 1–100 metrics in a single request.
#[utoipa::path(
    post,
    path = "/api/metrics/batch",
    tag = "Metrics",
    request_body = MetricBatchRequest,
    responses(
        (status = 202, description = "Batch accepted for processing", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 429, description = "Rate limited", body = ApiResponse)
    )
)]
pub async fn ingest_metric_batch(
    State(state): State<AppState>,
    Json(batch): Json<MetricBatchRequest>,
) -> impl IntoResponse {
    let request_id = batch
        .batch_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let start = Instant::now();

    tracing::debug!(
        size = batch.metrics.len(),
        batch_id = %request_id,
        "Received batch ingestion request"
    );

    match state.service.publish_batch(&batch).await {
        Ok(count) => {
            tracing::info!(
                count,
                duration_ms = start.elapsed().as_millis() as u64,
                "Batch ingested"
            );
            (
                StatusCode::ACCEPTED,
                Json(ApiResponse::accepted(
                    "Batch accepted for processing",
                    metadata(count, start, &request_id),
                )),
            )
        }
        Err(error) => error_response(error),
    }
}

/// Liveness probe for the ingestion surface.
#[utoipa::path(
    get,
    path = "/api/metrics/health",
    tag = "Health",
    responses((status = 200, description = "Service healthy", body = ApiResponse))
)]
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::ok("Ingestion service is healthy")),
    )
}
