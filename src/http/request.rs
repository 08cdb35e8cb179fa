//! Request inspection.
//!
//! # Responsibilities
//! - Derive the bounded `route` label from the matched route template
//! - Name the header that echoes the trace identifier
//!
//! # Design Decisions
//! - The route label is the router's template (`/tasks/:id`), never the
//!   literal path, so label cardinality does not grow with distinct ids
//! - Requests no route matched fall back to the literal path

use axum::extract::MatchedPath;
use axum::http::{HeaderName, Request};

/// Response header carrying the request's trace identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Metric/log label for the route this request was dispatched to.
pub fn route_label<B>(request: &Request<B>) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => template_label(matched.as_str()),
        None => request.uri().path().to_string(),
    }
}

/// Rewrite axum's `{param}` / `{*rest}` segments as `:param` / `*rest`.
pub fn template_label(template: &str) -> String {
    template
        .split('/')
        .map(|segment| {
            let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                return segment.to_string();
            };
            match inner.strip_prefix('*') {
                Some(wildcard) => format!("*{wildcard}"),
                None => format!(":{inner}"),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
