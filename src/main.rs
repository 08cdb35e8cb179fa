//! Observable task service.
//!
//! A small task CRUD API whose every request is traced, counted and
//! logged.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ ┌──────────────────────────────────────────────┐
//!                      │ observe (trace id, span)                     │
//!                      │   ┌──────────────────────────────────────┐   │
//!                      │   │ error_boundary (500 + fatal log)     │   │
//!                      │   │   ┌──────────────────────────────┐   │   │
//!                      │   │   │ timeout / body limit         │   │   │
//!                      │   │   │   ┌──────────────────────┐   │   │   │
//!                      │   │   │   │ api handlers         │──────────────▶ TaskStore
//!                      │   │   │   └──────────────────────┘   │   │   │
//!                      │   │   └──────────────────────────────┘   │   │
//!                      │   └──────────────────────────────────────┘   │
//!     ◀─────────────── │ counter increment + access record            │──▶ MetricRegistry
//!     Client Response  └──────────────────────────────────────────────┘      │
//!                                                                      GET /metrics
//! ```

use std::path::PathBuf;

use clap::Parser;

use observable_tasks::lifecycle::startup;
use observable_tasks::observability::logging;
use observable_tasks::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "observable-tasks")]
#[command(about = "Task API with request tracing, metrics and structured logs", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = startup::resolve_config(cli.config.as_deref(), cli.port)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        port = config.listener.port,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config)?;
    let listener = startup::bind(&server.state().config).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
