//! Server initialization and routing.
//!
//! Builds the Axum router with all endpoints and middleware, starts the
//! listener with graceful shutdown, and tears down the compute pool after
//! the last request drains.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, media, meta, not_found, tasks};
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.allows_any_origin() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .origins()
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(meta::health))
        .route("/metrics", get(meta::metrics))
        .route("/configuration", get(meta::configuration))
        .route("/code_iscc", post(media::code_iscc))
        .route("/from_url", post(tasks::from_url))
        .route("/task/{task_id}", get(tasks::poll_task))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the ISCC web service.
///
/// Initializes logging, constructs the shared state (task store, compute
/// pool, downloader), binds the listener, and blocks until SIGTERM or
/// Ctrl+C. Detached task runners that are still downloading or computing
/// when shutdown begins run to completion on the runtime; the compute pool
/// is joined after the server drains.
pub async fn start_server(config: ServiceConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with_target(false)
        .json()
        .init();

    let state = AppState::new(config.clone())?;
    let app = build_router(state.clone());

    let addr: SocketAddr = config.socket_addr()?;
    tracing::info!(
        addr = %addr,
        data_dir = %config.data_dir.display(),
        compute_workers = config.compute_workers,
        allowed_origins = %config.allowed_origins,
        "starting iscc-web"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.pool.shutdown();
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
