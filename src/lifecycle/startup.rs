//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration: optional TOML file, then CLI overrides
//! - Bind the listener last, once everything else is ready

use std::path::Path;

use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::{load_config, AppConfig, ConfigError};

/// Load `path` (or defaults when absent) and apply a port override.
pub fn resolve_config(path: Option<&Path>, port: Option<u16>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    if let Some(port) = port {
        config.listener.port = port;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Bind the configured address.
pub async fn bind(config: &AppConfig) -> std::io::Result<TcpListener> {
    let addr = config
        .listener
        .socket_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    TcpListener::bind(addr).await
}
