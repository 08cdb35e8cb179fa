//! Error responses.
//!
//! # Responsibilities
//! - Classify handler errors (validation, not found, unhandled)
//! - Map designed errors to their 4xx status and `{"error": ...}` body
//! - Map everything else to an opaque 500 carrying a [`FailureReport`]
//!   for the failure boundary
//!
//! # Design Decisions
//! - Diagnostic detail never reaches the response body; it travels in a
//!   response extension that the failure boundary removes and logs

use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::tasks::StoreError;

/// Body returned to callers for every error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The caller sent invalid input.
    #[error("{0}")]
    Validation(String),

    /// The body could not be decoded.
    #[error(transparent)]
    Rejected(#[from] JsonRejection),

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Anything not designed as a client-facing outcome.
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => AppError::Validation(message.to_string()),
            StoreError::NotFound(_) => AppError::NotFound("not found".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
            }
            AppError::Rejected(rejection) => {
                (rejection.status(), Json(ErrorBody::new(rejection.body_text()))).into_response()
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::new(message))).into_response()
            }
            AppError::Unhandled(err) => FailureReport::from_error(&err).into_response(),
        }
    }
}

/// Server-side description of an unhandled failure.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub message: String,
    pub detail: String,
}

impl FailureReport {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            // Debug output: cause chain, plus backtrace when enabled.
            detail: format!("{err:?}"),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self {
            detail: format!("handler panicked: {message}"),
            message,
        }
    }
}

impl IntoResponse for FailureReport {
    fn into_response(self) -> Response {
        let mut response = internal_error();
        response.extensions_mut().insert(self);
        response
    }
}

/// The only body callers ever see for a 500.
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("internal server error")),
    )
        .into_response()
}
