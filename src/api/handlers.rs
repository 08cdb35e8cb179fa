use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::AppError;
use crate::http::server::AppState;
use crate::tasks::{NewTask, Task};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Seconds since the service started.
    pub uptime: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedTask {
    pub message: String,
    pub task: Task,
}

pub async fn banner(State(state): State<AppState>) -> String {
    state.config.server.banner.clone()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK".to_string(),
        uptime: state.uptime().as_secs_f64(),
    })
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.tasks.list())
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let Json(new_task) = payload?;
    let task = state.tasks.create(new_task.title.as_deref())?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedTask>, AppError> {
    let task = state.tasks.delete(&id)?;
    Ok(Json(DeletedTask {
        message: "task deleted".to_string(),
        task,
    }))
}

/// Always fails; exercises the failure boundary.
pub async fn fail() -> Result<Json<Task>, AppError> {
    Err(anyhow::anyhow!("intentional failure requested via /error").into())
}

pub async fn not_found() -> AppError {
    AppError::NotFound("not found".to_string())
}
