//! Compute offload pool.
//!
//! Fingerprinting is CPU bound and must never run on the request loop. The
//! pool owns a fixed set of dedicated worker threads created at service
//! startup and joined at shutdown; jobs travel over a crossbeam channel and
//! each carries a oneshot for the reply, so the submitting async caller
//! suspends without blocking the runtime. A panic inside the engine is
//! contained on the worker: the caller sees a [`EngineError::Computation`]
//! and the pool stays usable for subsequent submissions.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio::sync::oneshot;

use crate::engine::{EngineError, FingerprintEngine, FingerprintResult};

struct Job {
    path: PathBuf,
    title: String,
    extra: String,
    reply: oneshot::Sender<Result<FingerprintResult, EngineError>>,
}

/// Fixed pool of fingerprint workers.
///
/// Process-wide resource: constructed once during service start, injected
/// into every handler that needs it, shut down during service stop.
pub struct ComputePool {
    tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl ComputePool {
    /// Spawn `workers` threads running jobs against `engine`.
    pub fn start(workers: usize, engine: Arc<dyn FingerprintEngine>) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = unbounded::<Job>();

        let handles = (0..workers)
            .map(|id| {
                let rx = rx.clone();
                let engine = engine.clone();
                thread::Builder::new()
                    .name(format!("compute-{id}"))
                    .spawn(move || worker_loop(id, rx, engine))
                    .unwrap_or_else(|err| panic!("failed to spawn compute worker: {err}"))
            })
            .collect();

        tracing::info!(workers, "compute pool started");
        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Submit one fingerprint computation and await its result.
    ///
    /// Suspends the calling flow until a worker finishes; other requests
    /// keep running during the wait.
    pub async fn compute(
        &self,
        path: PathBuf,
        title: String,
        extra: String,
    ) -> Result<FingerprintResult, EngineError> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            path,
            title,
            extra,
            reply,
        };

        let sender = {
            let guard = self.tx.lock().unwrap_or_else(|p| p.into_inner());
            (*guard).clone()
        };
        let Some(sender) = sender else {
            return Err(EngineError::Computation("compute pool is shut down".to_string()));
        };
        sender
            .send(job)
            .map_err(|_| EngineError::Computation("compute pool is shut down".to_string()))?;

        rx.await
            .map_err(|_| EngineError::Computation("compute worker dropped the job".to_string()))?
    }

    /// Tear the pool down: close the job channel and join every worker.
    ///
    /// In-flight jobs run to completion first. Safe to call more than once.
    pub fn shutdown(&self) {
        {
            let mut guard = self.tx.lock().unwrap_or_else(|p| p.into_inner());
            if guard.take().is_none() {
                return;
            }
        }
        let handles = {
            let mut guard = self.workers.lock().unwrap_or_else(|p| p.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("compute worker panicked outside a job");
            }
        }
        tracing::info!("compute pool shut down");
    }
}

fn worker_loop(id: usize, rx: Receiver<Job>, engine: Arc<dyn FingerprintEngine>) {
    for job in rx.iter() {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            engine.compute_fingerprint(&job.path, &job.title, &job.extra)
        }))
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(worker = id, reason = %reason, "fingerprint engine panicked");
            Err(EngineError::Computation(format!(
                "fingerprint worker panicked: {reason}"
            )))
        });

        // The awaiting caller may be gone; nothing to do then.
        let _ = job.reply.send(outcome);
    }
}
