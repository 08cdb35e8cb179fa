//! Task records exchanged over the API.

use serde::{Deserialize, Serialize};

/// A task owned by the [`TaskStore`](super::TaskStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub done: bool,
}

/// Body of `POST /tasks`. `title` is optional here so that a missing
/// field is reported as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub title: Option<String>,
}
