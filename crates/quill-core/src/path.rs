//! Position paths — hierarchical tree coordinates with a total order.
//!
//! A [`PositionPath`] locates a node inside the document tree as a sequence
//! of non-negative indices (section, block, row/cell, inline…). Paths compare
//! lexicographically element-by-element with a missing component treated as
//! `-1`, so a parent always sorts before its descendants. This ordering is
//! the canonical document order; every other component builds on it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A position path: the sequence of child indices from the document root.
///
/// The document root itself is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionPath(Vec<u32>);

impl PositionPath {
    /// The document root path (empty).
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from raw components.
    #[must_use]
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// The raw components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of components (0 for the root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path extended by one child index.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut components = self.0.clone();
        components.push(index);
        Self(components)
    }

    /// The parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The final component, or `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Whether `self` is a strict descendant of `ancestor`: strictly longer
    /// and sharing the ancestor's full prefix.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }

    /// Render dot-joined, e.g. `0.2.1`. The root renders as `0`.
    #[must_use]
    pub fn dotted(&self) -> String {
        if self.0.is_empty() {
            "0".to_owned()
        } else {
            self.0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".")
        }
    }

    /// Parse a dot-joined path string.
    pub fn parse_dotted(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let mut components = Vec::new();
        for part in s.split('.') {
            components.push(part.parse::<u32>().ok()?);
        }
        Some(Self(components))
    }
}

impl Ord for PositionPath {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            // A missing component compares as -1, so shorter paths sort
            // first at a shared prefix.
            let a = self.0.get(i).map_or(-1, |&c| i64::from(c));
            let b = other.0.get(i).map_or(-1, |&c| i64::from(c));
            match a.cmp(&b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for PositionPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PositionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<Vec<u32>> for PositionPath {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl From<&[u32]> for PositionPath {
    fn from(components: &[u32]) -> Self {
        Self(components.to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
