//! Last-resort failure boundary.
//!
//! Sits between the observability middleware and the handlers. Any
//! handler that returns an unhandled error or panics ends up here: the
//! failure is logged at `fatal` with the request's trace id and turned
//! into the generic 500 response. Designed 4xx outcomes pass through
//! untouched.

use std::panic::AssertUnwindSafe;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use crate::http::request::route_label;
use crate::http::response::{internal_error, FailureReport};
use crate::observability::TraceContext;

/// Response extension telling the observability middleware that the
/// handler failed and this response is the boundary's conversion.
#[derive(Debug, Clone, Copy)]
pub struct HandlerFailed;

pub async fn error_boundary(mut request: Request, next: Next) -> Response {
    let trace = match request.extensions().get::<TraceContext>() {
        Some(trace) => trace.clone(),
        None => {
            let trace = TraceContext::new_trace();
            request.extensions_mut().insert(trace.clone());
            trace
        }
    };
    let method = request.method().to_string();
    let route = route_label(&request);

    let (mut response, report) = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(mut response) => {
            let report = response.extensions_mut().remove::<FailureReport>();
            (response, report)
        }
        Err(payload) => (internal_error(), Some(FailureReport::from_panic(payload))),
    };

    if let Some(report) = report {
        tracing::error!(
            target: "http.failure",
            severity = "fatal",
            trace_id = %trace.id(),
            method = %method,
            route = %route,
            status = response.status().as_u16(),
            stack = %report.detail,
            "{}",
            report.message
        );
        response.extensions_mut().insert(HandlerFailed);
    }

    response
}
