//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/observe.rs (trace id, request span)
//!     → middleware/error_boundary.rs (failure containment)
//!     → api handlers (business logic)
//!     → response.rs (error taxonomy → status + body)
//!     → middleware/observe.rs (metric + access log)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{route_label, X_REQUEST_ID};
pub use response::{AppError, ErrorBody, FailureReport};
pub use server::{build_router, AppState, HttpServer};
