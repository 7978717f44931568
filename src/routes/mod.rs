//! HTTP endpoint implementations.
//!
//! - `media`: synchronous fingerprinting of uploaded files
//! - `tasks`: URL submission and task polling
//! - `meta`: service info, configuration echo, health, metrics

pub mod media;
pub mod meta;
pub mod tasks;

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};

/// Root endpoint: service identification and the endpoint list.
pub async fn api_info() -> ServiceResult<impl IntoResponse> {
    Ok(Json(json!({
        "message": "ISCC Web Service API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /code_iscc",
            "POST /from_url",
            "GET /task/{task_id}",
            "GET /configuration",
            "GET /health",
            "GET /metrics"
        ]
    })))
}

/// 404 Not Found handler for undefined routes.
pub async fn not_found() -> ServiceError {
    ServiceError::NotFound
}
