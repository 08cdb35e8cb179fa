//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application state (metrics registry, task store)
//! - Create the Axum Router with all handlers
//! - Wire up middleware (observability, failure boundary, timeout, body limit)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;

use crate::api;
use crate::config::AppConfig;
use crate::http::middleware::{error_boundary, observe};
use crate::observability::metrics::RegistryError;
use crate::observability::MetricRegistry;
use crate::tasks::TaskStore;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricRegistry>,
    pub tasks: Arc<TaskStore>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    /// Construct the process-wide services. Metric registration errors
    /// surface here, before any traffic is accepted.
    pub fn new(config: AppConfig) -> Result<Self, RegistryError> {
        let metrics = MetricRegistry::with_http_metrics()?;
        metrics.collect_default();

        Ok(Self {
            metrics: Arc::new(metrics),
            tasks: Arc::new(TaskStore::new()),
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// HTTP server for the task service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, RegistryError> {
        let state = AppState::new(config)?;
        let router = build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// The service's routes with the full middleware stack.
pub fn build_router(state: AppState) -> Router {
    instrument(api::routes(), state)
}

/// Wrap `routes` in the middleware stack.
///
/// Layers, outermost first: observability, failure boundary, timeout,
/// body limit. Timeouts and rejected bodies are counted like any other
/// response.
#[allow(deprecated)]
pub fn instrument(routes: Router<AppState>, state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    routes
        .fallback(api::handlers::not_found)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(error_boundary))
        .layer(middleware::from_fn_with_state(state.clone(), observe))
        .with_state(state)
}
