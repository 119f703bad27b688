use chrono::NaiveDateTime;
use pulsemon_common::codec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// A single metric submission. `metricType` is the lowercase code or the
/// uppercase wire name, matched case-insensitively.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricRequest {
    pub service_name: String,
    pub metric_type: String,
    pub metric_value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, with = "codec::datetime_opt")]
    #[schema(value_type = Option<String>, example = "2025-06-01T12:00:00")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

/// 1–100 metrics submitted in one request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricBatchRequest {
    #[serde(default)]
    pub batch_id: Option<String>,
    pub metrics: Vec<MetricRequest>,
}

/// Uniform response envelope of the ingestion API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub processed_count: usize,
    pub processing_time_ms: u128,
    pub request_id: String,
}

impl ApiResponse {
    pub fn accepted(message: &str, metadata: ResponseMetadata) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            errors: Vec::new(),
            metadata: Some(metadata),
        }
    }

    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            errors: Vec::new(),
            metadata: None,
        }
    }

    pub fn failure(message: &str, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            errors,
            metadata: None,
        }
    }
}
