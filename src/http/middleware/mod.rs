//! Request middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → observe.rs (trace allocated, request span opened)
//!     → error_boundary.rs (unhandled errors and panics become 500)
//!     → handler
//!     → error_boundary.rs (fatal record for failures)
//!     → observe.rs (counter increment + access record)
//! response
//! ```

pub mod error_boundary;
pub mod observe;

pub use error_boundary::{error_boundary, HandlerFailed};
pub use observe::{observe, Phase, RequestLifecycle};
