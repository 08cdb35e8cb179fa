//! Observable task service library.

pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod tasks;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
