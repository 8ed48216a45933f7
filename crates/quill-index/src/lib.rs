//! Element index and ranked search for Quill documents.
//!
//! [`ElementIndex`] flattens a document tree into addressable elements with
//! derived positional IDs and a content revision token. [`SearchIndex`]
//! ranks those elements with BM25, phrase, and proximity scoring, with an
//! exhaustive regex path and inline exact-phrase fusion on top.

pub mod element;
pub mod search;

pub use element::{ElementIndex, IndexedElement, PREVIEW_CHARS};
pub use search::{
    DEFAULT_MAX_RESULTS, ScoreBreakdown, SearchHit, SearchIndex, SearchMode, SearchQuery,
};
