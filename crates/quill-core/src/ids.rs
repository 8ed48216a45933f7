//! Identifiers: branded session/run IDs and derived element IDs.
//!
//! Two ID families live here:
//!
//! - **Branded IDs** ([`SessionId`], [`RunId`], [`RequestId`], [`ToolCallId`])
//!   are opaque UUID v7 newtypes for orchestration entities.
//! - **Element IDs** are *derived* from an element's kind and current
//!   [`PositionPath`]: `"{prefix}-{path}"`. They are a view of structural
//!   position, not stable handles — any mutation can change them, so they
//!   must never be cached across an index rebuild.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::path::PositionPath;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for an assistant session (one conversation).
    SessionId
}

branded_id! {
    /// Unique identifier for a run within a session.
    RunId
}

branded_id! {
    /// Unique identifier for an outstanding tool request within a run.
    RequestId
}

branded_id! {
    /// Unique identifier for a single tool call within a tool round.
    ToolCallId
}

// ─────────────────────────────────────────────────────────────────────────────
// Element kinds and derived IDs
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of indexable element kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// The singleton document root.
    Document,
    /// A top-level section.
    Section,
    /// A paragraph (top-level or inside a table cell).
    Paragraph,
    /// A table block.
    Table,
    /// A row within a table.
    TableRow,
    /// A cell within a table row.
    TableCell,
    /// A styled text run inside a paragraph.
    InlineText,
    /// An inline image inside a paragraph.
    InlineImage,
}

/// All element kinds in declaration order.
pub const ALL_KINDS: [ElementKind; 8] = [
    ElementKind::Document,
    ElementKind::Section,
    ElementKind::Paragraph,
    ElementKind::Table,
    ElementKind::TableRow,
    ElementKind::TableCell,
    ElementKind::InlineText,
    ElementKind::InlineImage,
];

impl ElementKind {
    /// The fixed ID prefix for this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Document => "d",
            Self::Section => "s",
            Self::Paragraph => "p",
            Self::Table => "t",
            Self::TableRow => "tr",
            Self::TableCell => "tc",
            Self::InlineText => "it",
            Self::InlineImage => "ii",
        }
    }

    /// Wire name, e.g. `table-row`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Section => "section",
            Self::Paragraph => "paragraph",
            Self::Table => "table",
            Self::TableRow => "table-row",
            Self::TableCell => "table-cell",
            Self::InlineText => "inline-text",
            Self::InlineImage => "inline-image",
        }
    }

    /// Parse a kind from its ID prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        ALL_KINDS.into_iter().find(|k| k.prefix() == prefix)
    }

    /// Parse a kind from its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_KINDS.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed ID of the document root.
pub const DOCUMENT_ID: &str = "d-0";

/// Derive the element ID for a kind at a position path.
///
/// The document root is always the literal `d-0`; every other ID is the
/// kind prefix joined to the dot-rendered path.
#[must_use]
pub fn element_id(kind: ElementKind, path: &PositionPath) -> String {
    if kind == ElementKind::Document {
        DOCUMENT_ID.to_owned()
    } else {
        format!("{}-{}", kind.prefix(), path.dotted())
    }
}

/// Recover `(kind, path)` from a derived element ID.
///
/// Returns `None` for anything that is not a well-formed derived ID.
#[must_use]
pub fn parse_element_id(id: &str) -> Option<(ElementKind, PositionPath)> {
    let (prefix, rest) = id.split_once('-')?;
    let kind = ElementKind::from_prefix(prefix)?;
    if kind == ElementKind::Document {
        return (rest == "0").then(|| (kind, PositionPath::root()));
    }
    let path = PositionPath::parse_dotted(rest)?;
    Some((kind, path))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
