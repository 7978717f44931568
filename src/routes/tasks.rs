//! URL task submission and polling.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::runner;
use crate::store::StoreError;
use crate::task::{Task, task_id_for};

use crate::state::AppState;

/// Request body for `POST /from_url`.
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

/// Submit a URL for background fingerprinting.
///
/// Creates the `pending` record, spawns a detached runner, and returns
/// immediately; the runner outlives this request and cannot be cancelled.
/// A resubmission of a URL whose task is still in flight returns the
/// existing record without spawning a second runner, so the store keeps a
/// single writer per id. Terminal records are overwritten by a fresh run.
pub async fn from_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UrlRequest>,
) -> ServiceResult<impl IntoResponse> {
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(ServiceError::BadRequest(format!(
            "url must be http(s), got {}",
            request.url
        )));
    }

    let task_id = task_id_for(&request.url);
    match state.store.load(&task_id) {
        Ok(existing) if !existing.status.is_terminal() => {
            tracing::info!(task_id = %task_id, "duplicate submission of in-flight task");
            return Ok(Json(existing));
        }
        Ok(_) | Err(StoreError::NotFound(_)) => {}
        Err(other) => return Err(other.into()),
    }

    let task = Task::new(request.url, request.title, request.extra);
    state.store.create(&task)?;

    tokio::spawn(runner::run_task(state.runner_deps(), task.clone()));
    tracing::info!(task_id = %task.task_id, url = %task.url, "task created");
    Ok(Json(task))
}

/// Poll a task: `GET /task/{task_id}`.
///
/// Returns the current record. The first poll that observes a terminal
/// status deletes the downloaded artifact, best effort; the record itself
/// stays, so repeated polls keep succeeding after cleanup.
pub async fn poll_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    let task = state.store.load(&task_id)?;

    if task.status.is_terminal() {
        if let Some(filename) = &task.filename {
            let artifact = state.store.artifact_path(filename);
            match tokio::fs::remove_file(&artifact).await {
                Ok(()) => {
                    tracing::debug!(task_id = %task_id, artifact = %filename, "artifact removed");
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    // Cleanup is best effort and never fails the poll.
                    tracing::warn!(
                        task_id = %task_id,
                        artifact = %filename,
                        error = %err,
                        "artifact cleanup failed"
                    );
                }
            }
        }
    }

    Ok(Json(task))
}
