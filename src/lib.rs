//! iscc-web - HTTP service for ISCC media fingerprinting.
//!
//! Exposes media-fingerprint computation over HTTP for uploaded files and
//! remotely fetched URLs. The fingerprint algorithm itself is an opaque
//! collaborator behind [`engine::FingerprintEngine`]; this crate is the
//! orchestration around it:
//!
//! - **Upload gate**: sniffs the leading bytes of an upload and rejects
//!   unsupported media before committing to the transfer.
//! - **Compute pool**: fixed worker threads that keep the CPU-bound
//!   fingerprinting off the request loop, with panic containment.
//! - **URL tasks**: `POST /from_url` creates a durable, content-addressed
//!   task record and a detached runner drives it through
//!   `pending -> downloading -> processing -> {success|failed}`, persisting
//!   every transition; clients poll `GET /task/{task_id}`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use iscc_web::ServiceConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::load()?;
//!     iscc_web::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /code_iscc` - Fingerprint an uploaded file (multipart)
//! - `POST /from_url` - Submit a URL for background fingerprinting
//! - `GET /task/{task_id}` - Poll a task record
//! - `GET /configuration` - Static configuration echo
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod gate;
pub mod mediatype;
pub mod middleware;
pub mod pool;
pub mod routes;
pub mod runner;
pub mod server;
pub mod state;
pub mod store;
pub mod task;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use server::{build_router, start_server};
pub use state::AppState;
pub use task::{Task, TaskStatus, task_id_for};
