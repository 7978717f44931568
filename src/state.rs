//! Shared application state.
//!
//! All process-wide resources are constructed here, once, and injected
//! into handlers through axum's `State` extractor; nothing is global.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ServiceConfig;
use crate::download::{Downloader, HttpDownloader};
use crate::engine::{FingerprintEngine, HashEngine};
use crate::pool::ComputePool;
use crate::runner::RunnerDeps;
use crate::store::TaskStore;

/// Shared application state
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: TaskStore,
    pub pool: Arc<ComputePool>,
    pub downloader: Arc<dyn Downloader>,
    /// Render handle for the Prometheus exposition endpoint. `None` when a
    /// recorder was already installed in this process (tests spin up many
    /// states).
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Create state with the production collaborators: the built-in hash
    /// engine and the reqwest downloader.
    pub fn new(config: ServiceConfig) -> anyhow::Result<Arc<Self>> {
        Self::with_collaborators(config, Arc::new(HashEngine), Arc::new(HttpDownloader::new()))
    }

    /// Create state with explicit collaborators. Tests substitute scripted
    /// engines and downloaders here.
    pub fn with_collaborators(
        config: ServiceConfig,
        engine: Arc<dyn FingerprintEngine>,
        downloader: Arc<dyn Downloader>,
    ) -> anyhow::Result<Arc<Self>> {
        let store = TaskStore::new(config.data_dir.clone())?;
        let pool = Arc::new(ComputePool::start(config.compute_workers, engine));

        let metrics = match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "metrics recorder already installed");
                None
            }
        };

        Ok(Arc::new(Self {
            config: Arc::new(config),
            store,
            pool,
            downloader,
            metrics,
            started_at: Instant::now(),
        }))
    }

    /// Dependency bundle handed to detached task runners.
    pub fn runner_deps(&self) -> RunnerDeps {
        RunnerDeps {
            store: self.store.clone(),
            downloader: self.downloader.clone(),
            pool: self.pool.clone(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
