//! API route handlers
//!
//! - `health`: liveness, readiness, and Prometheus metrics
//! - `process_data`: synchronous allocation over the configured data files
//! - `allocations`: background allocation jobs

pub mod allocations;
pub mod health;
pub mod process_data;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /, no authentication).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "topicmatch",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/process-data",
            "/api/v1/allocations",
            "/api/v1/allocations/{job_id}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
