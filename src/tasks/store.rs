//! Task storage.

use std::sync::RwLock;

use uuid::Uuid;

use crate::tasks::types::Task;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("task `{0}` not found")]
    NotFound(String),
}

/// Thread-safe, insertion-ordered task collection.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all live tasks.
    pub fn list(&self) -> Vec<Task> {
        self.tasks.read().expect("task store lock poisoned").clone()
    }

    /// Create a task. A missing or blank title is rejected without
    /// touching the collection.
    pub fn create(&self, title: Option<&str>) -> Result<Task, StoreError> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .ok_or(StoreError::Validation("title required"))?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            done: false,
        };

        self.tasks
            .write()
            .expect("task store lock poisoned")
            .push(task.clone());

        tracing::debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Remove a task and return it.
    pub fn delete(&self, id: &str) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        let index = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let task = tasks.remove(index);
        tracing::debug!(task_id = %task.id, "Task deleted");
        Ok(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.read().expect("task store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_create_assigns_unique_ids() {
        let store = TaskStore::new();
        let a = store.create(Some("write tests")).unwrap();
        let b = store.create(Some("write tests")).unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.done);
        assert_eq!(store.list(), vec![a, b]);
    }

    #[test]
    fn test_create_rejects_missing_or_blank_title() {
        let store = TaskStore::new();
        assert_eq!(store.create(None), Err(StoreError::Validation("title required")));
        assert_eq!(store.create(Some("")), Err(StoreError::Validation("title required")));
        assert_eq!(store.create(Some("   ")), Err(StoreError::Validation("title required")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_removes_once() {
        let store = TaskStore::new();
        let keep = store.create(Some("keep")).unwrap();
        let drop = store.create(Some("drop")).unwrap();

        assert_eq!(store.delete(&drop.id), Ok(drop.clone()));
        assert_eq!(store.list(), vec![keep]);
        assert_eq!(store.delete(&drop.id), Err(StoreError::NotFound(drop.id)));
    }

    #[test]
    fn test_concurrent_creates() {
        let store = Arc::new(TaskStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        store.create(Some(&format!("task {i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let ids: HashSet<_> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 800);
    }
}
