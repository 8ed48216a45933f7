//! Anchor resolution for block insertion.
//!
//! An anchor names an existing element plus an edge; it resolves to a block
//! slot `(section, block)` where a new top-level block would be inserted.
//! Elements below the block level (inline runs, table rows and cells, cell
//! paragraphs) resolve through the top-level block that contains them.

use quill_core::{ElementKind, QuillError, QuillResult};
use quill_doc::Document;
use quill_index::ElementIndex;
use serde::{Deserialize, Serialize};

/// Which side of the anchored element to insert on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Before the element (or at its first child slot).
    Begin,
    /// After the element (or past its last child slot).
    End,
}

/// An insertion anchor: element ID plus edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Existing element the insertion is relative to.
    pub id: String,
    /// Side to insert on.
    pub edge: Edge,
}

/// A resolved insertion point among the top-level blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockSlot {
    /// Section index.
    pub section: usize,
    /// Block index within the section (insertion position).
    pub block: usize,
}

/// Resolve `anchor` against the current index into a block slot.
pub fn resolve_block_slot(
    doc: &Document,
    index: &ElementIndex,
    anchor: &Anchor,
) -> QuillResult<BlockSlot> {
    let element = index.require(&anchor.id)?;
    let components = element.path.components();

    match element.kind {
        ElementKind::Document => {
            let slot = match anchor.edge {
                Edge::Begin => BlockSlot {
                    section: 0,
                    block: 0,
                },
                Edge::End => {
                    let section = doc.sections.len().saturating_sub(1);
                    BlockSlot {
                        section,
                        block: doc.sections[section].blocks.len(),
                    }
                }
            };
            Ok(slot)
        }
        ElementKind::Section => {
            let section = components[0] as usize;
            let block = match anchor.edge {
                Edge::Begin => 0,
                Edge::End => doc
                    .sections
                    .get(section)
                    .map_or(0, |s| s.blocks.len()),
            };
            Ok(BlockSlot { section, block })
        }
        _ => {
            // Everything else lives at or below a top-level block; the first
            // two path components name it.
            let section = components[0] as usize;
            let block = components[1] as usize;
            let block = match anchor.edge {
                Edge::Begin => block,
                Edge::End => block + 1,
            };
            Ok(BlockSlot { section, block })
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quill_doc::{Block, Table, TableCell, TableRow};

    use super::*;

    fn doc_with_table() -> Document {
        let mut doc = Document::from_paragraphs(["first", "second"]);
        doc.sections[0].blocks.push(Block::Table(Table {
            rows: vec![TableRow {
                cells: vec![TableCell::from_text("cell")],
            }],
        }));
        doc
    }

    fn anchor(id: &str, edge: Edge) -> Anchor {
        Anchor {
            id: id.into(),
            edge,
        }
    }

    #[test]
    fn document_edges() {
        let doc = doc_with_table();
        let index = ElementIndex::rebuild(&doc);
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("d-0", Edge::Begin)).unwrap(),
            BlockSlot {
                section: 0,
                block: 0
            }
        );
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("d-0", Edge::End)).unwrap(),
            BlockSlot {
                section: 0,
                block: 3
            }
        );
    }

    #[test]
    fn section_edges() {
        let doc = doc_with_table();
        let index = ElementIndex::rebuild(&doc);
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("s-0", Edge::Begin)).unwrap(),
            BlockSlot {
                section: 0,
                block: 0
            }
        );
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("s-0", Edge::End)).unwrap(),
            BlockSlot {
                section: 0,
                block: 3
            }
        );
    }

    #[test]
    fn block_edges_use_own_slot() {
        let doc = doc_with_table();
        let index = ElementIndex::rebuild(&doc);
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("p-0.1", Edge::Begin)).unwrap(),
            BlockSlot {
                section: 0,
                block: 1
            }
        );
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("p-0.1", Edge::End)).unwrap(),
            BlockSlot {
                section: 0,
                block: 2
            }
        );
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("t-0.2", Edge::End)).unwrap(),
            BlockSlot {
                section: 0,
                block: 3
            }
        );
    }

    #[test]
    fn nested_elements_resolve_through_their_block() {
        let doc = doc_with_table();
        let index = ElementIndex::rebuild(&doc);
        // An inline run inside the first paragraph.
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("it-0.0.0", Edge::End)).unwrap(),
            BlockSlot {
                section: 0,
                block: 1
            }
        );
        // A cell inside the table block.
        assert_eq!(
            resolve_block_slot(&doc, &index, &anchor("tc-0.2.0.0", Edge::Begin)).unwrap(),
            BlockSlot {
                section: 0,
                block: 2
            }
        );
    }

    #[test]
    fn unknown_anchor_is_not_found() {
        let doc = doc_with_table();
        let index = ElementIndex::rebuild(&doc);
        assert_matches!(
            resolve_block_slot(&doc, &index, &anchor("p-9.9", Edge::Begin)),
            Err(QuillError::NotFound { .. })
        );
    }
}
