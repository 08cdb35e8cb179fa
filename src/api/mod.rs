//! Service routes.
//!
//! | Method | Path          | Handler                         |
//! |--------|---------------|---------------------------------|
//! | GET    | `/`           | [`handlers::banner`]            |
//! | GET    | `/health`     | [`handlers::health`]            |
//! | GET    | `/tasks`      | [`handlers::list_tasks`]        |
//! | POST   | `/tasks`      | [`handlers::create_task`]       |
//! | DELETE | `/tasks/{id}` | [`handlers::delete_task`]       |
//! | GET    | `/metrics`    | [`exporter::export_metrics`]    |
//! | GET    | `/error`      | [`handlers::fail`]              |
//!
//! [`exporter::export_metrics`]: crate::observability::exporter::export_metrics

pub mod handlers;

use axum::{
    routing::{delete, get},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;
use crate::observability::exporter::export_metrics;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", delete(delete_task))
        .route("/metrics", get(export_metrics))
        .route("/error", get(fail))
}
