//! Task runner and store lifecycle tests.
//!
//! These drive the runner state machine directly with scripted downloaders
//! and engines, verifying the persistence contract: every transition is
//! saved, terminal failures stay retrievable, and the record never
//! regresses along `pending -> downloading -> processing -> terminal`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use iscc_web::download::{DownloadError, Downloader};
use iscc_web::engine::{EngineError, FingerprintEngine, FingerprintResult, HashEngine};
use iscc_web::pool::ComputePool;
use iscc_web::runner::{RunnerDeps, run_task};
use iscc_web::store::TaskStore;
use iscc_web::task::{Task, TaskStatus};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Writes a small PNG artifact after an optional delay.
struct ScriptedDownloader {
    delay: Option<Duration>,
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn download(
        &self,
        _url: &str,
        dest_dir: &Path,
        task_id: &str,
    ) -> Result<String, DownloadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let name = format!("{task_id}-artifact.png");
        let mut body = PNG_MAGIC.to_vec();
        body.extend_from_slice(&[0xAB; 64]);
        tokio::fs::write(dest_dir.join(&name), body).await?;
        Ok(name)
    }
}

struct UnreachableDownloader;

#[async_trait]
impl Downloader for UnreachableDownloader {
    async fn download(
        &self,
        _url: &str,
        _dest_dir: &Path,
        _task_id: &str,
    ) -> Result<String, DownloadError> {
        Err(DownloadError::Request("connection refused".to_string()))
    }
}

struct FailingEngine;

impl FingerprintEngine for FailingEngine {
    fn compute_fingerprint(
        &self,
        _path: &Path,
        _title: &str,
        _extra: &str,
    ) -> Result<FingerprintResult, EngineError> {
        Err(EngineError::Computation("codec rejected the stream".to_string()))
    }
}

fn deps(
    store: &TaskStore,
    downloader: Arc<dyn Downloader>,
    engine: Arc<dyn FingerprintEngine>,
) -> RunnerDeps {
    RunnerDeps {
        store: store.clone(),
        downloader,
        pool: Arc::new(ComputePool::start(1, engine)),
    }
}

fn create_task(store: &TaskStore, url: &str) -> Task {
    let task = Task::new(url.to_string(), Some("A Title".to_string()), None);
    store.create(&task).unwrap();
    task
}

fn status_rank(status: TaskStatus) -> usize {
    match status {
        TaskStatus::Pending => 0,
        TaskStatus::Downloading => 1,
        TaskStatus::Processing => 2,
        TaskStatus::Success | TaskStatus::Failed => 3,
    }
}

#[tokio::test]
async fn url_task_reaches_success() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path()).unwrap();
    let task = create_task(&store, "https://example.org/a.png");

    let deps = deps(&store, Arc::new(ScriptedDownloader { delay: None }), Arc::new(HashEngine));
    run_task(deps.clone(), task.clone()).await;

    let loaded = store.load(&task.task_id).unwrap();
    assert_eq!(loaded.status, TaskStatus::Success);
    let result = loaded.result.expect("success task carries a result");
    assert!(!result["fingerprint"].as_str().unwrap().is_empty());
    assert_eq!(result["mediatype"], "image/png");
    let message = loaded.message.expect("terminal message records timing");
    assert!(message.starts_with("Processing Time: "), "got {message}");
    let filename = loaded.filename.expect("filename set after download");
    assert!(store.artifact_path(&filename).is_file());
    deps.pool.shutdown();
}

#[tokio::test]
async fn download_failure_is_terminal_and_retrievable() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path()).unwrap();
    let task = create_task(&store, "https://unreachable.example/a.png");

    let deps = deps(&store, Arc::new(UnreachableDownloader), Arc::new(HashEngine));
    run_task(deps.clone(), task.clone()).await;

    let loaded = store.load(&task.task_id).unwrap();
    assert_eq!(loaded.status, TaskStatus::Failed);
    let message = loaded.message.expect("failure carries a diagnostic");
    assert!(message.contains("download failed with"), "got {message}");
    assert!(loaded.result.is_none());

    // The record is not discarded: a second read still succeeds.
    assert_eq!(store.load(&task.task_id).unwrap().status, TaskStatus::Failed);
    deps.pool.shutdown();
}

#[tokio::test]
async fn compute_failure_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path()).unwrap();
    let task = create_task(&store, "https://example.org/b.png");

    let deps = deps(&store, Arc::new(ScriptedDownloader { delay: None }), Arc::new(FailingEngine));
    run_task(deps.clone(), task.clone()).await;

    // The on-disk record must show the terminal state, not a task stuck
    // at `processing`.
    let loaded = store.load(&task.task_id).unwrap();
    assert_eq!(loaded.status, TaskStatus::Failed);
    let message = loaded.message.expect("failure carries a diagnostic");
    assert!(message.contains("processing failed with"), "got {message}");
    assert!(loaded.filename.is_some(), "filename survives the failure");
    deps.pool.shutdown();
}

#[tokio::test]
async fn observed_status_sequence_never_regresses() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path()).unwrap();
    let task = create_task(&store, "https://example.org/slow.png");

    let deps = deps(
        &store,
        Arc::new(ScriptedDownloader {
            delay: Some(Duration::from_millis(50)),
        }),
        Arc::new(HashEngine),
    );
    let pool = deps.pool.clone();
    let runner = tokio::spawn(run_task(deps, task.clone()));

    let mut observed: Vec<TaskStatus> = vec![];
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let current = store.load(&task.task_id).unwrap();
            if observed.last() != Some(&current.status) {
                observed.push(current.status);
            }
            if current.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task never reached a terminal state");
    runner.await.unwrap();

    for pair in observed.windows(2) {
        assert!(
            status_rank(pair[0]) < status_rank(pair[1]),
            "status regressed: {observed:?}"
        );
    }
    assert_eq!(*observed.last().unwrap(), TaskStatus::Success);
    pool.shutdown();
}

#[tokio::test]
async fn concurrent_saves_never_corrupt_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::new(dir.path()).unwrap();
    let base = create_task(&store, "https://example.org/contended.png");

    let mut handles = vec![];
    for i in 0..16 {
        let store = store.clone();
        let mut task = base.clone();
        handles.push(tokio::spawn(async move {
            task.message = Some(format!("writer {i}"));
            for _ in 0..25 {
                store.save(&task).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whole-record overwrite: the survivor is one writer's record, never
    // an unparsable mix.
    let loaded = store.load(&base.task_id).unwrap();
    let message = loaded.message.expect("some writer's message survives");
    assert!(message.starts_with("writer "), "got {message}");
    assert_eq!(loaded.url, base.url);
}
