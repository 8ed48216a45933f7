//! The document tree: sections containing blocks, blocks being paragraphs
//! or tables.

use serde::{Deserialize, Serialize};

use crate::paragraph::Paragraph;

/// A cell holds one or more paragraphs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell paragraphs in display order.
    pub paragraphs: Vec<Paragraph>,
}

impl TableCell {
    /// A cell with a single paragraph of plain text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::from_text(text, None)],
        }
    }

    /// Overwrite the cell with exactly one paragraph holding `text`.
    /// Any additional paragraphs are dropped.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.paragraphs = vec![Paragraph::from_text(text, None)];
    }

    /// Cell text as seen by search: paragraph texts joined with spaces.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::search_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One table row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in column order.
    pub cells: Vec<TableCell>,
}

/// A table block. Row 0 is the header row by convention.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in display order.
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Table text as seen by search: cells joined with `" | "`, rows with
    /// newlines.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(TableCell::search_text)
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A top-level block within a section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    /// A paragraph block.
    Paragraph(Paragraph),
    /// A table block.
    Table(Table),
}

impl Block {
    /// The contained paragraph, if any.
    #[must_use]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Self::Paragraph(p) => Some(p),
            Self::Table(_) => None,
        }
    }

    /// The contained table, if any.
    #[must_use]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            Self::Paragraph(_) => None,
        }
    }
}

/// A top-level section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Blocks in display order.
    pub blocks: Vec<Block>,
}

/// The document root. Always holds at least one section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Sections in display order.
    pub sections: Vec<Section>,
}

impl Document {
    /// An empty document with one empty section.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sections: vec![Section::default()],
        }
    }

    /// A document whose first section holds one paragraph per input string.
    #[must_use]
    pub fn from_paragraphs<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: vec![Section {
                blocks: texts
                    .into_iter()
                    .map(|t| Block::Paragraph(Paragraph::from_text(t, None)))
                    .collect(),
            }],
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_one_section() {
        assert_eq!(Document::new().sections.len(), 1);
    }

    #[test]
    fn cell_set_text_keeps_exactly_one_paragraph() {
        let mut cell = TableCell {
            paragraphs: vec![
                Paragraph::from_text("one", None),
                Paragraph::from_text("two", None),
            ],
        };
        cell.set_text("only");
        assert_eq!(cell.paragraphs.len(), 1);
        assert_eq!(cell.paragraphs[0].plain_text(), "only");
    }

    #[test]
    fn table_search_text_joins_cells_and_rows() {
        let table = Table {
            rows: vec![
                TableRow {
                    cells: vec![TableCell::from_text("Name"), TableCell::from_text("Age")],
                },
                TableRow {
                    cells: vec![TableCell::from_text("Ada"), TableCell::from_text("36")],
                },
            ],
        };
        assert_eq!(table.search_text(), "Name | Age\nAda | 36");
    }

    #[test]
    fn block_accessors() {
        let block = Block::Paragraph(Paragraph::from_text("hi", None));
        assert!(block.as_paragraph().is_some());
        assert!(block.as_table().is_none());
    }

    #[test]
    fn document_serde_roundtrip() {
        let doc = Document::from_paragraphs(["alpha", "beta"]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
