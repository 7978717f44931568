//! Service metadata: configuration echo, health, metrics.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;

use crate::error::ServiceResult;
use crate::mediatype;
use crate::state::AppState;

/// Static service configuration echo: `GET /configuration`.
pub async fn configuration(State(state): State<Arc<AppState>>) -> ServiceResult<impl IntoResponse> {
    let cfg = &state.config;
    Ok(Json(json!({
        "service": "iscc-web",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_media_types": mediatype::supported_by_kind(),
        "max_body_bytes": cfg.max_body_bytes(),
        "compute_workers": cfg.compute_workers,
        "allowed_origins": cfg.allowed_origins,
        "data_dir": cfg.data_dir.display().to_string(),
    })))
}

/// Liveness probe: `GET /health`.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "iscc-web",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Prometheus text exposition: `GET /metrics`.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
