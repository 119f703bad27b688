use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

/// Generate a 16-character hex trace ID (8 random bytes).
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Request/response logging middleware. Every request gets a trace id
/// that is logged on both sides and returned in an `X-Trace-Id` header.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    // Swagger UI static assets are noise.
    if path.starts_with("/docs") {
        return next.run(request).await;
    }

    let trace_id = generate_trace_id();
    let method = request.method().clone();
    let start = Instant::now();

    tracing::info!(trace_id = %trace_id, method = %method, path = %path, "--> request");

    let mut response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(trace_id = %trace_id, status = %status, elapsed_ms, "<-- response");
    } else if status.is_client_error() {
        tracing::warn!(trace_id = %trace_id, status = %status, elapsed_ms, "<-- response");
    } else {
        tracing::info!(trace_id = %trace_id, status = %status, elapsed_ms, "<-- response");
    }

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("X-Trace-Id", value);
    }
    response
}
