//! Foundation types for Quill: position paths with a total document order,
//! derived element IDs, the shared error taxonomy, session event wire types,
//! and small text utilities. No internal dependencies; everything above
//! builds on this crate.

pub mod errors;
pub mod events;
pub mod ids;
pub mod path;
pub mod text;

pub use errors::{QuillError, QuillResult};
pub use events::{ChatMessage, ErrorBody, Role, SessionEvent, ToolCall, ToolObservation};
pub use ids::{
    DOCUMENT_ID, ElementKind, RequestId, RunId, SessionId, ToolCallId, element_id,
    parse_element_id,
};
pub use path::PositionPath;
