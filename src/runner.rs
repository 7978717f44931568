//! Detached task runner: download, compute, persist.
//!
//! Drives one task through `downloading -> processing -> {success|failed}`,
//! saving the record after every transition so a poll at any moment reads
//! the true state. Spawned with `tokio::spawn` and fire-and-forget: the
//! submitting request returns immediately and cancellation of that request
//! has no effect on the runner. Every failure is terminal for the task; a
//! fresh submission is the only retry.

use std::sync::Arc;
use std::time::Instant;

use crate::download::Downloader;
use crate::pool::ComputePool;
use crate::store::TaskStore;
use crate::task::{Task, TaskStatus};

/// Everything the runner needs, detached from any request.
#[derive(Clone)]
pub struct RunnerDeps {
    pub store: TaskStore,
    pub downloader: Arc<dyn Downloader>,
    pub pool: Arc<ComputePool>,
}

/// Run one URL task to a terminal state.
///
/// The caller has already created and saved the `pending` record.
pub async fn run_task(deps: RunnerDeps, mut task: Task) {
    let started = Instant::now();
    let task_id = task.task_id.clone();
    tracing::info!(task_id = %task_id, url = %task.url, "task runner started");

    task.status = TaskStatus::Downloading;
    if !persist(&deps.store, &task) {
        return;
    }

    let filename = match deps
        .downloader
        .download(&task.url, deps.store.dir(), &task_id)
        .await
    {
        Ok(filename) => filename,
        Err(err) => {
            task.status = TaskStatus::Failed;
            task.message = Some(format!("download failed with {err}"));
            persist(&deps.store, &task);
            metrics::counter!("tasks_failed").increment(1);
            tracing::warn!(task_id = %task_id, error = %err, "download failed");
            return;
        }
    };

    task.status = TaskStatus::Processing;
    task.filename = Some(filename.clone());
    if !persist(&deps.store, &task) {
        return;
    }

    let title = task.title.clone().unwrap_or_default();
    let extra = task.extra.clone().unwrap_or_default();
    let artifact = deps.store.artifact_path(&filename);
    match deps.pool.compute(artifact, title, extra).await {
        Ok(result) => {
            task.status = TaskStatus::Success;
            task.result = Some(result);
            task.message = Some(format!(
                "Processing Time: {:.2}",
                started.elapsed().as_secs_f64()
            ));
            persist(&deps.store, &task);
            metrics::counter!("tasks_succeeded").increment(1);
            tracing::info!(
                task_id = %task_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task succeeded"
            );
        }
        Err(err) => {
            // This terminal transition must be persisted like every other;
            // skipping the save leaves the task stuck at `processing` for
            // every client.
            task.status = TaskStatus::Failed;
            task.message = Some(format!("processing failed with {err}"));
            persist(&deps.store, &task);
            metrics::counter!("tasks_failed").increment(1);
            tracing::warn!(task_id = %task_id, error = %err, "computation failed");
        }
    }
}

/// Save the record; a store failure here is unrecoverable for the task,
/// so it is logged and the runner gives up.
fn persist(store: &TaskStore, task: &Task) -> bool {
    match store.save(task) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(task_id = %task.task_id, error = %err, "failed to persist task");
            false
        }
    }
}
