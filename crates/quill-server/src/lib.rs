//! Axum HTTP/SSE boundary for Quill sessions.
//!
//! Exposes session creation, an SSE event stream, run start, and tool-result
//! submission over the orchestrator in `quill-session`, plus an in-process
//! [`host::DocumentHost`] that executes requested tools against a locally
//! held document.

pub mod config;
pub mod echo;
pub mod error;
pub mod host;
pub mod routes;

pub use config::QuillConfig;
pub use error::ApiError;
pub use host::DocumentHost;
pub use routes::{AppState, router};
