//! Pull-based metrics endpoint.
//!
//! `GET /metrics` renders the registry on demand. Whether scrapes are
//! themselves counted is controlled by `observability.count_metrics_endpoint`
//! (default: counted, under the fixed `/metrics` route label).

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::http::server::AppState;

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn export_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.export(),
    )
}
