//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → tracing.rs (trace id + request span)
//!     → metrics.rs (http_requests_total increment)
//!     → logging.rs (one JSON access record)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → exporter.rs (Prometheus scrape of GET /metrics)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace id flows through every log record of a request
//! - Metrics are cheap (atomic increments)
//! - Trace ids are local; nothing is propagated to other services

pub mod exporter;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::metrics::{CounterDefinition, MetricRegistry, RegistryError};
pub use self::tracing::TraceContext;
