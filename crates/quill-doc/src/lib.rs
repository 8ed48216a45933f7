//! Mutable document tree for Quill.
//!
//! A [`Document`] is a list of sections; sections hold blocks; a block is a
//! paragraph or a table; paragraphs hold inline text and image runs; table
//! cells hold paragraphs again. Edit operations are synchronous,
//! character-offset based, and validate before mutating, so a failed call
//! never leaves a half-applied change.

pub mod model;
pub mod paragraph;
pub mod style;

pub use model::{Block, Document, Section, Table, TableCell, TableRow};
pub use paragraph::{ImageRun, InlineRun, Paragraph, TextRun};
pub use style::TextStyle;
