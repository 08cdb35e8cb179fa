//! Per-request trace context.
//!
//! # Responsibilities
//! - Generate a unique identifier for every inbound request
//! - Carry it for the lifetime of that request only
//! - Open the request span that correlates handler logs
//!
//! # Design Decisions
//! - UUID v4 (122 random bits): collisions are negligible for the process lifetime
//! - Generated locally; no inbound trace headers are honoured
//! - Stored in request extensions so both the completion path and the
//!   failure path of the same request read the same value

use std::fmt;
use std::time::{Instant, SystemTime};

use uuid::Uuid;

/// Identifier and start time of a single request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    id: String,
    created_at: SystemTime,
    started: Instant,
}

impl TraceContext {
    /// Allocate a fresh trace. O(1), no I/O.
    pub fn new_trace() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: SystemTime::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wall-clock time the request entered the pipeline.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Monotonic time since the trace was created, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Span that handler logs inherit `trace_id` from.
    pub fn span(&self, method: &str, route: &str) -> tracing::Span {
        tracing::info_span!("request", trace_id = %self.id, method = %method, route = %route)
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_trace_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..1_000_000 {
            assert!(seen.insert(TraceContext::new_trace().id().to_string()));
        }
    }

    #[test]
    fn test_trace_id_is_uuid() {
        let trace = TraceContext::new_trace();
        assert!(Uuid::parse_str(trace.id()).is_ok());
        assert_eq!(trace.to_string(), trace.id());
        assert!(trace.created_at() <= SystemTime::now());
        assert!(trace.elapsed_ms() >= 0.0);
    }
}
