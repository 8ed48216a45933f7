//! Mutation engine for Quill documents.
//!
//! Defines the tool contract offered to the model (definitions, schemas,
//! registry) and [`DocumentEngine`], which executes those tools against an
//! owned document: anchored insertion, range edits, table rewriting,
//! styling, and deletion, each returning the post-state revision token.

pub mod anchor;
pub mod color;
pub mod engine;
pub mod tools;

pub use anchor::{Anchor, BlockSlot, Edge, resolve_block_slot};
pub use color::normalize_color;
pub use engine::{DEFAULT_FONT_SIZE, DEFAULT_SCROLL_LIMIT, DocumentEngine, FONT_SIZE_RANGE};
pub use tools::{ToolDefinition, ToolParameterSchema, ToolRegistry};
