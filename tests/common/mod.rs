//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use observable_tasks::config::AppConfig;
use observable_tasks::http::AppState;
use observable_tasks::{HttpServer, Shutdown};

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the service with default configuration.
pub async fn start_server() -> TestServer {
    start_server_with(AppConfig::default()).await
}

pub async fn start_server_with(config: AppConfig) -> TestServer {
    let server = HttpServer::new(config).unwrap();
    let state = server.state().clone();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        state,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Value of one `http_requests_total` sample in a scrape, if present.
#[allow(dead_code)]
pub fn requests_total(scrape: &str, method: &str, route: &str, status: u16) -> Option<u64> {
    let prefix = format!(
        r#"http_requests_total{{method="{method}",route="{route}",status_code="{status}"}} "#
    );
    scrape
        .lines()
        .find_map(|l| l.strip_prefix(prefix.as_str()))
        .and_then(|v| v.trim().parse().ok())
}
