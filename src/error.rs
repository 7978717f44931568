//! Service error types and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::download::DownloadError;
use crate::engine::EngineError;
use crate::gate::GateError;
use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced to HTTP callers.
///
/// Background-job failures never pass through here; the runner captures
/// them into the task record instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("fingerprint computation failed: {0}")]
    ComputationFailed(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::DownloadFailed(_) => StatusCode::BAD_GATEWAY,
            ServiceError::ComputationFailed(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::NotFound => "NOT_FOUND",
            ServiceError::DownloadFailed(_) => "DOWNLOAD_FAILED",
            ServiceError::ComputationFailed(_) => "COMPUTATION_FAILED",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unsupported(detected) => ServiceError::UnsupportedMediaType(detected),
            GateError::Stream(message) => ServiceError::BadRequest(message),
            GateError::Io(err) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unsupported(detected) => ServiceError::UnsupportedMediaType(detected),
            EngineError::Computation(message) => ServiceError::ComputationFailed(message),
        }
    }
}

impl From<DownloadError> for ServiceError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Scheme(url) => {
                ServiceError::BadRequest(format!("unsupported url scheme in {url}"))
            }
            other => ServiceError::DownloadFailed(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ServiceError::NotFound,
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Internal(format!("io error: {err}"))
    }
}
