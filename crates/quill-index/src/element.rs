//! Flattening a document tree into addressable elements.
//!
//! The index is cheap to rebuild and is rebuilt before and after every read
//! or mutation; element IDs are positional and stale the moment the tree
//! changes, so nothing here is ever cached across an edit.

use std::collections::HashMap;

use quill_core::{ElementKind, PositionPath, QuillError, QuillResult, element_id};
use quill_doc::{Block, Document, InlineRun, Paragraph};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Maximum preview length in characters.
pub const PREVIEW_CHARS: usize = 80;

/// One addressable element of the flattened tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedElement {
    /// Derived positional ID, e.g. `p-0.2`.
    pub id: String,
    /// Parent element ID; `None` only for the document root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Element kind.
    pub kind: ElementKind,
    /// Position path from the root.
    #[serde(skip)]
    pub path: PositionPath,
    /// Search text truncated for display.
    pub preview: String,
    /// Full text as seen by search.
    #[serde(skip)]
    pub search_text: String,
}

/// The flattened element index of one document state.
#[derive(Clone, Debug, Default)]
pub struct ElementIndex {
    elements: Vec<IndexedElement>,
    by_id: HashMap<String, usize>,
}

impl ElementIndex {
    /// Flatten `doc` depth-first into a fresh index.
    #[must_use]
    pub fn rebuild(doc: &Document) -> Self {
        let mut elements = Vec::new();
        push(
            &mut elements,
            ElementKind::Document,
            PositionPath::root(),
            None,
            String::new(),
        );
        for (s, section) in doc.sections.iter().enumerate() {
            let section_path = PositionPath::root().child(u32::try_from(s).unwrap_or(u32::MAX));
            let section_id = push(
                &mut elements,
                ElementKind::Section,
                section_path.clone(),
                Some(quill_core::DOCUMENT_ID.to_owned()),
                String::new(),
            );
            for (b, block) in section.blocks.iter().enumerate() {
                let block_path = section_path.child(u32::try_from(b).unwrap_or(u32::MAX));
                match block {
                    Block::Paragraph(para) => {
                        walk_paragraph(&mut elements, para, block_path, section_id.clone());
                    }
                    Block::Table(table) => {
                        let table_id = push(
                            &mut elements,
                            ElementKind::Table,
                            block_path.clone(),
                            Some(section_id.clone()),
                            table.search_text(),
                        );
                        for (r, row) in table.rows.iter().enumerate() {
                            let row_path =
                                block_path.child(u32::try_from(r).unwrap_or(u32::MAX));
                            let row_text = row
                                .cells
                                .iter()
                                .map(quill_doc::TableCell::search_text)
                                .collect::<Vec<_>>()
                                .join(" | ");
                            let row_id = push(
                                &mut elements,
                                ElementKind::TableRow,
                                row_path.clone(),
                                Some(table_id.clone()),
                                row_text,
                            );
                            for (c, cell) in row.cells.iter().enumerate() {
                                let cell_path =
                                    row_path.child(u32::try_from(c).unwrap_or(u32::MAX));
                                let cell_id = push(
                                    &mut elements,
                                    ElementKind::TableCell,
                                    cell_path.clone(),
                                    Some(row_id.clone()),
                                    cell.search_text(),
                                );
                                for (p, para) in cell.paragraphs.iter().enumerate() {
                                    let para_path =
                                        cell_path.child(u32::try_from(p).unwrap_or(u32::MAX));
                                    walk_paragraph(
                                        &mut elements,
                                        para,
                                        para_path,
                                        cell_id.clone(),
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        elements.sort_by(|a, b| a.path.cmp(&b.path));
        let by_id = elements
            .iter()
            .enumerate()
            .map(|(i, el)| (el.id.clone(), i))
            .collect();
        Self { elements, by_id }
    }

    /// All elements in document order.
    #[must_use]
    pub fn elements(&self) -> &[IndexedElement] {
        &self.elements
    }

    /// Number of indexed elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the index is empty (never true after a rebuild: the root is
    /// always present).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IndexedElement> {
        self.by_id.get(id).map(|&i| &self.elements[i])
    }

    /// Look up an element by ID, failing with `NotFound`.
    pub fn require(&self, id: &str) -> QuillResult<&IndexedElement> {
        self.get(id).ok_or_else(|| QuillError::not_found(id))
    }

    /// Direct children of `parent_id`, stable in document order.
    #[must_use]
    pub fn children(&self, parent_id: &str) -> Vec<&IndexedElement> {
        self.elements
            .iter()
            .filter(|el| el.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Content revision token: `"{count}-{hex16}"`.
    ///
    /// Equal tokens mean the indexed trees are structurally and textually
    /// equal (a fingerprint, never a lock).
    #[must_use]
    pub fn revision(&self) -> String {
        let mut hasher = Sha256::new();
        for el in &self.elements {
            hasher.update(el.id.as_bytes());
            hasher.update([0x1f]);
            hasher.update(el.kind.as_str().as_bytes());
            hasher.update([0x1f]);
            hasher.update(el.parent_id.as_deref().unwrap_or("").as_bytes());
            hasher.update([0x1f]);
            hasher.update(el.search_text.as_bytes());
            hasher.update([0x1e]);
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{}-{}", self.elements.len(), &hex[..16])
    }
}

fn push(
    elements: &mut Vec<IndexedElement>,
    kind: ElementKind,
    path: PositionPath,
    parent_id: Option<String>,
    search_text: String,
) -> String {
    let id = element_id(kind, &path);
    elements.push(IndexedElement {
        id: id.clone(),
        parent_id,
        kind,
        path,
        preview: quill_core::text::truncate_with_suffix(&search_text, PREVIEW_CHARS),
        search_text,
    });
    id
}

fn walk_paragraph(
    elements: &mut Vec<IndexedElement>,
    para: &Paragraph,
    path: PositionPath,
    parent_id: String,
) {
    let para_id = push(
        elements,
        ElementKind::Paragraph,
        path.clone(),
        Some(parent_id),
        para.search_text(),
    );
    for (k, run) in para.runs.iter().enumerate() {
        let run_path = path.child(u32::try_from(k).unwrap_or(u32::MAX));
        match run {
            InlineRun::Text(tr) => {
                let _ = push(
                    elements,
                    ElementKind::InlineText,
                    run_path,
                    Some(para_id.clone()),
                    tr.text.clone(),
                );
            }
            InlineRun::Image(img) => {
                let _ = push(
                    elements,
                    ElementKind::InlineImage,
                    run_path,
                    Some(para_id.clone()),
                    img.placeholder(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quill_doc::{Table, TableCell, TableRow, TextStyle};

    use super::*;

    fn table_doc() -> Document {
        let mut doc = Document::from_paragraphs(["intro paragraph"]);
        doc.sections[0].blocks.push(Block::Table(Table {
            rows: vec![
                TableRow {
                    cells: vec![TableCell::from_text("Name"), TableCell::from_text("Age")],
                },
                TableRow {
                    cells: vec![TableCell::from_text("Ada"), TableCell::from_text("36")],
                },
            ],
        }));
        doc
    }

    #[test]
    fn root_is_always_first() {
        let index = ElementIndex::rebuild(&Document::new());
        assert_eq!(index.elements()[0].id, "d-0");
        assert_eq!(index.elements()[0].parent_id, None);
        // Root plus the single empty section.
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn flatten_assigns_positional_ids() {
        let index = ElementIndex::rebuild(&table_doc());
        let ids: Vec<&str> = index.elements().iter().map(|el| el.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "d-0", "s-0", "p-0.0", "it-0.0.0", "t-0.1", "tr-0.1.0", "tc-0.1.0.0",
                "p-0.1.0.0.0", "it-0.1.0.0.0.0", "tc-0.1.0.1", "p-0.1.0.1.0", "it-0.1.0.1.0.0",
                "tr-0.1.1", "tc-0.1.1.0", "p-0.1.1.0.0", "it-0.1.1.0.0.0", "tc-0.1.1.1",
                "p-0.1.1.1.0", "it-0.1.1.1.0.0",
            ]
        );
    }

    #[test]
    fn element_text_per_kind() {
        let index = ElementIndex::rebuild(&table_doc());
        assert_eq!(index.get("p-0.0").unwrap().search_text, "intro paragraph");
        assert_eq!(
            index.get("t-0.1").unwrap().search_text,
            "Name | Age\nAda | 36"
        );
        assert_eq!(index.get("tr-0.1.0").unwrap().search_text, "Name | Age");
        assert_eq!(index.get("tc-0.1.1.0").unwrap().search_text, "Ada");
        assert_eq!(index.get("it-0.0.0").unwrap().search_text, "intro paragraph");
    }

    #[test]
    fn children_are_in_document_order() {
        let index = ElementIndex::rebuild(&table_doc());
        let rows: Vec<&str> = index
            .children("t-0.1")
            .iter()
            .map(|el| el.id.as_str())
            .collect();
        assert_eq!(rows, vec!["tr-0.1.0", "tr-0.1.1"]);
        let blocks: Vec<&str> = index
            .children("s-0")
            .iter()
            .map(|el| el.id.as_str())
            .collect();
        assert_eq!(blocks, vec!["p-0.0", "t-0.1"]);
    }

    #[test]
    fn require_miss_is_not_found() {
        let index = ElementIndex::rebuild(&Document::new());
        assert_matches!(index.require("p-9.9"), Err(QuillError::NotFound { .. }));
    }

    #[test]
    fn rebuild_without_changes_is_id_stable() {
        let doc = table_doc();
        let first = ElementIndex::rebuild(&doc);
        let second = ElementIndex::rebuild(&doc);
        let first_ids: Vec<_> = first.elements().iter().map(|el| &el.id).collect();
        let second_ids: Vec<_> = second.elements().iter().map(|el| &el.id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.revision(), second.revision());
    }

    #[test]
    fn revision_format_and_sensitivity() {
        let doc = table_doc();
        let index = ElementIndex::rebuild(&doc);
        let revision = index.revision();
        let (count, hash) = revision.split_once('-').unwrap();
        assert_eq!(count.parse::<usize>().unwrap(), index.len());
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        let mut changed = doc;
        if let Block::Paragraph(p) = &mut changed.sections[0].blocks[0] {
            p.replace_range(0, 5, "outro", None).unwrap();
        }
        assert_ne!(ElementIndex::rebuild(&changed).revision(), revision);
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(200);
        let doc = Document::from_paragraphs([long]);
        let index = ElementIndex::rebuild(&doc);
        let preview = &index.get("p-0.0").unwrap().preview;
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn image_runs_index_as_placeholders() {
        let mut doc = Document::new();
        doc.sections[0].blocks.push(Block::Paragraph(Paragraph {
            runs: vec![
                InlineRun::text("fig: ", TextStyle::default()),
                InlineRun::Image(quill_doc::ImageRun {
                    width: 640,
                    height: 480,
                    alt: Some("chart".into()),
                }),
            ],
        }));
        let index = ElementIndex::rebuild(&doc);
        assert_eq!(index.get("ii-0.0.1").unwrap().search_text, "[image 640x480]");
        assert_eq!(
            index.get("p-0.0").unwrap().search_text,
            "fig: [image 640x480]"
        );
    }
}
