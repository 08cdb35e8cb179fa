//! Request observability middleware.
//!
//! # Lifecycle
//! ```text
//! STARTED ──▶ HANDLER_RUNNING ──┬──▶ COMPLETED  (handler returned a response)
//!                               └──▶ FAILED     (failure boundary converted it)
//! ```
//!
//! Exactly one terminal transition happens per request, after the final
//! status is known: one `http_requests_total` increment and one
//! `http.access` log record. `RequestLifecycle::finish` consumes the
//! lifecycle, so a second transition cannot be expressed.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::http::middleware::error_boundary::HandlerFailed;
use crate::http::request::{route_label, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::metrics::HTTP_REQUESTS_TOTAL;
use crate::observability::{MetricRegistry, TraceContext};

const METRICS_ROUTE: &str = "/metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    HandlerRunning,
    Completed,
    Failed,
}

impl Phase {
    fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Observability state of one in-flight request.
#[derive(Debug)]
pub struct RequestLifecycle {
    trace: TraceContext,
    method: String,
    route: String,
    phase: Phase,
}

impl RequestLifecycle {
    /// Allocate the trace and attach it to the request.
    pub fn start(request: &mut Request) -> Self {
        let trace = TraceContext::new_trace();
        request.extensions_mut().insert(trace.clone());
        Self {
            trace,
            method: request.method().to_string(),
            route: route_label(request),
            phase: Phase::Started,
        }
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn handler_running(&mut self) -> tracing::Span {
        self.phase = Phase::HandlerRunning;
        self.trace.span(&self.method, &self.route)
    }

    /// Terminal transition: count the request and write its access record.
    pub fn finish(mut self, response: &Response, metrics: Option<&MetricRegistry>) -> Phase {
        let failed = response.extensions().get::<HandlerFailed>().is_some();
        self.phase = if failed { Phase::Failed } else { Phase::Completed };

        let status = response.status();
        let status_code = status.as_u16().to_string();

        if let Some(metrics) = metrics {
            let labels = [
                ("method", self.method.as_str()),
                ("route", self.route.as_str()),
                ("status_code", status_code.as_str()),
            ];
            if let Err(e) = metrics.increment(HTTP_REQUESTS_TOTAL, &labels) {
                tracing::error!(error = %e, "Failed to record request metric");
            }
        }

        let message = if failed { "request failed" } else { "request completed" };
        if status.as_u16() < 400 {
            tracing::info!(
                target: "http.access",
                trace_id = %self.trace.id(),
                method = %self.method,
                route = %self.route,
                status = status.as_u16(),
                duration_ms = self.trace.elapsed_ms(),
                "{message}"
            );
        } else {
            tracing::error!(
                target: "http.access",
                trace_id = %self.trace.id(),
                method = %self.method,
                route = %self.route,
                status = status.as_u16(),
                duration_ms = self.trace.elapsed_ms(),
                "{message}"
            );
        }

        self.phase
    }
}

impl Drop for RequestLifecycle {
    fn drop(&mut self) {
        // Connection dropped before a response existed; nothing to count.
        if !self.phase.is_terminal() {
            tracing::debug!(
                trace_id = %self.trace.id(),
                method = %self.method,
                route = %self.route,
                phase = ?self.phase,
                "Request abandoned before completion"
            );
        }
    }
}

/// Middleware wrapping every route.
pub async fn observe(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut lifecycle = RequestLifecycle::start(&mut request);
    let span = lifecycle.handler_running();

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(lifecycle.trace().id()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let counted = state.config.observability.count_metrics_endpoint
        || lifecycle.route() != METRICS_ROUTE;
    lifecycle.finish(&response, counted.then_some(state.metrics.as_ref()));

    response
}
