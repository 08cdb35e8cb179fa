//! In-memory task collection.
//!
//! # Data Flow
//! ```text
//! POST /tasks        → store.rs create (validate title, assign id, append)
//! GET /tasks         → store.rs list (snapshot clone)
//! DELETE /tasks/{id} → store.rs delete (remove, return record)
//! ```
//!
//! # Design Decisions
//! - Process lifetime only; nothing is persisted
//! - Insertion order is preserved for listing
//! - One `RwLock` guards the collection: listing never observes a
//!   half-applied mutation

pub mod store;
pub mod types;

pub use store::{StoreError, TaskStore};
pub use types::{NewTask, Task};
