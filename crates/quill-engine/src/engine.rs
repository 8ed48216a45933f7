//! The document engine: executes tool calls against an owned document.
//!
//! Every operation re-indexes the document before resolving its inputs and
//! again after mutating, and returns the post-state revision token. Argument
//! validation happens before any mutation, so a failed call never leaves a
//! half-applied change.

use quill_core::{ElementKind, QuillError, QuillResult, ToolCall, ToolObservation};
use quill_doc::{
    Block, Document, InlineRun, Paragraph, Section, Table, TableCell, TableRow, TextRun,
    TextStyle,
};
use quill_index::{ElementIndex, SearchIndex, SearchQuery};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::anchor::{Anchor, BlockSlot, resolve_block_slot};
use crate::color::normalize_color;
use crate::tools::ToolRegistry;

/// Effective font size assumed for runs without an explicit size.
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
/// Inclusive font-size bounds in points.
pub const FONT_SIZE_RANGE: (f64, f64) = (1.0, 400.0);
/// Default page size for `scroll_elements`.
pub const DEFAULT_SCROLL_LIMIT: usize = 50;

const STYLE_TARGET_PREFIXES: &str = "p, it, tr, tc";

// ─────────────────────────────────────────────────────────────────────────────
// Tool parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListParams {
    #[serde(default)]
    kinds: Option<Vec<ElementKind>>,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ScrollParams {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default = "default_scroll_limit")]
    limit: usize,
    #[serde(default)]
    kinds: Option<Vec<ElementKind>>,
}

fn default_scroll_limit() -> usize {
    DEFAULT_SCROLL_LIMIT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ParagraphItem {
    anchor: Anchor,
    text: String,
    #[serde(default)]
    text_style: Option<TextStyle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AddParagraphsParams {
    items: Vec<ParagraphItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RangeEdit {
    start: usize,
    end: usize,
    text: String,
    #[serde(default)]
    text_style: Option<TextStyle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReplaceParagraphParams {
    id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    text_style: Option<TextStyle>,
    #[serde(default)]
    edit: Option<RangeEdit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AddTableParams {
    anchor: Anchor,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReplaceTableParams {
    id: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EditImageParams {
    id: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeleteParams {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StyleParams {
    id: String,
    text_style: TextStyle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AdjustParams {
    id: String,
    font_size_delta: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Owns a document and executes tool calls against it.
pub struct DocumentEngine {
    doc: Document,
    registry: ToolRegistry,
}

impl DocumentEngine {
    /// Wrap a document.
    #[must_use]
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            registry: ToolRegistry::builtin(),
        }
    }

    /// The current document state.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Tool definitions for the model.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Fresh element index of the current state.
    #[must_use]
    pub fn index(&self) -> ElementIndex {
        ElementIndex::rebuild(&self.doc)
    }

    /// Current revision token.
    #[must_use]
    pub fn revision(&self) -> String {
        self.index().revision()
    }

    /// Execute a named tool with JSON arguments.
    pub fn execute(&mut self, name: &str, args: Value) -> QuillResult<Value> {
        if !self.registry.contains(name) {
            return Err(QuillError::Validation(format!("unknown tool: {name}")));
        }
        debug!(tool = name, "executing tool");
        match name {
            "list_elements" => self.list_elements(parse_args(name, args)?),
            "search_elements" => self.search_elements(parse_args(name, args)?),
            "scroll_elements" => self.scroll_elements(parse_args(name, args)?),
            "add_paragraphs" => self.add_paragraphs(parse_args(name, args)?),
            "replace_paragraph" => self.replace_paragraph(parse_args(name, args)?),
            "add_table" => self.add_table(parse_args(name, args)?),
            "replace_table" => self.replace_table(parse_args(name, args)?),
            "edit_image" => self.edit_image(parse_args(name, args)?),
            "delete_element" => self.delete_element(parse_args(name, args)?),
            "set_table_header_text_style" => {
                self.set_table_header_text_style(parse_args(name, args)?)
            }
            "set_paragraph_text_style" => self.set_paragraph_text_style(parse_args(name, args)?),
            "adjust_paragraph_text_style" => {
                self.adjust_paragraph_text_style(parse_args(name, args)?)
            }
            _ => Err(QuillError::Internal(format!(
                "registered tool without dispatch arm: {name}"
            ))),
        }
    }

    /// Execute one tool call and fold the outcome into an observation.
    pub fn execute_call(&mut self, call: &ToolCall) -> ToolObservation {
        match self.execute(&call.name, call.arguments.clone()) {
            Ok(result) => ToolObservation {
                tool_call_id: call.id.clone(),
                content: result.to_string(),
                is_error: false,
            },
            Err(err) => {
                debug!(tool = %call.name, code = err.code(), "tool call failed");
                ToolObservation {
                    tool_call_id: call.id.clone(),
                    content: json!({"code": err.code(), "message": err.to_string()}).to_string(),
                    is_error: true,
                }
            }
        }
    }

    // ── Read tools ──────────────────────────────────────────────────────────

    fn list_elements(&self, params: ListParams) -> QuillResult<Value> {
        let index = self.index();
        if let Some(parent_id) = &params.parent_id {
            let _ = index.require(parent_id)?;
        }
        let elements: Vec<&quill_index::IndexedElement> = index
            .elements()
            .iter()
            .filter(|el| {
                params
                    .kinds
                    .as_ref()
                    .is_none_or(|kinds| kinds.contains(&el.kind))
                    && params
                        .parent_id
                        .as_ref()
                        .is_none_or(|p| el.parent_id.as_ref() == Some(p))
            })
            .collect();
        Ok(json!({
            "docRevision": index.revision(),
            "totalCount": elements.len(),
            "elements": elements,
        }))
    }

    fn search_elements(&self, query: SearchQuery) -> QuillResult<Value> {
        let index = self.index();
        let hits = SearchIndex::rebuild(index.elements()).search(&query)?;
        Ok(json!({
            "docRevision": index.revision(),
            "totalCount": hits.len(),
            "hits": hits,
        }))
    }

    fn scroll_elements(&self, params: ScrollParams) -> QuillResult<Value> {
        if params.limit == 0 {
            return Err(QuillError::Validation("limit must be at least 1".into()));
        }
        let index = self.index();
        let start = match &params.cursor {
            Some(cursor) => {
                let after = index.require(cursor)?;
                index
                    .elements()
                    .iter()
                    .position(|el| el.id == after.id)
                    .map_or(0, |i| i + 1)
            }
            None => 0,
        };
        let filtered: Vec<&quill_index::IndexedElement> = index.elements()[start..]
            .iter()
            .filter(|el| {
                params
                    .kinds
                    .as_ref()
                    .is_none_or(|kinds| kinds.contains(&el.kind))
            })
            .collect();
        let page = &filtered[..params.limit.min(filtered.len())];
        let next_cursor = if filtered.len() > page.len() {
            page.last().map(|el| el.id.clone())
        } else {
            None
        };
        Ok(json!({
            "docRevision": index.revision(),
            "elements": page,
            "nextCursor": next_cursor,
        }))
    }

    // ── Mutating tools ──────────────────────────────────────────────────────

    fn add_paragraphs(&mut self, params: AddParagraphsParams) -> QuillResult<Value> {
        // Resolve every anchor against the pre-batch state first; a bad
        // anchor anywhere fails the whole batch untouched.
        let index = self.index();
        let mut resolved: Vec<(BlockSlot, Paragraph)> = Vec::with_capacity(params.items.len());
        for item in &params.items {
            let slot = resolve_block_slot(&self.doc, &index, &item.anchor)?;
            let style = item.text_style.as_ref().map(|s| sanitize_style(s));
            resolved.push((slot, Paragraph::from_text(item.text.clone(), style)));
        }

        // Apply deepest-first so earlier slots stay valid; submission order
        // is preserved within a shared slot.
        resolved.sort_by(|a, b| b.0.cmp(&a.0));
        let mut i = 0;
        while i < resolved.len() {
            let slot = resolved[i].0;
            let mut offset = 0;
            while i < resolved.len() && resolved[i].0 == slot {
                let para = resolved[i].1.clone();
                self.section_mut(slot.section)?
                    .blocks
                    .insert(slot.block + offset, Block::Paragraph(para));
                offset += 1;
                i += 1;
            }
        }

        Ok(json!({
            "docRevision": self.revision(),
            "inserted": params.items.len(),
        }))
    }

    fn replace_paragraph(&mut self, params: ReplaceParagraphParams) -> QuillResult<Value> {
        let index = self.index();
        let element = index.require(&params.id)?;
        require_kind(element.kind, &[ElementKind::Paragraph], "p")?;
        let path = element.path.components().to_vec();

        if let Some(edit) = params.edit {
            let style = edit.text_style.as_ref().map(|s| sanitize_style(s));
            self.paragraph_mut_at(&path)?
                .replace_range(edit.start, edit.end, &edit.text, style.as_ref())?;
        } else if let Some(text) = params.text {
            let style = params.text_style.as_ref().map(|s| sanitize_style(s));
            *self.paragraph_mut_at(&path)? = Paragraph::from_text(text, style);
        } else {
            return Err(QuillError::Validation(
                "either text or edit is required".into(),
            ));
        }
        Ok(json!({"docRevision": self.revision()}))
    }

    fn add_table(&mut self, params: AddTableParams) -> QuillResult<Value> {
        let index = self.index();
        let slot = resolve_block_slot(&self.doc, &index, &params.anchor)?;
        let table = Table {
            rows: build_table_rows(&params.headers, &params.rows),
        };
        self.section_mut(slot.section)?
            .blocks
            .insert(slot.block, Block::Table(table));
        Ok(json!({"docRevision": self.revision()}))
    }

    fn replace_table(&mut self, params: ReplaceTableParams) -> QuillResult<Value> {
        let index = self.index();
        let element = index.require(&params.id)?;
        require_kind(element.kind, &[ElementKind::Table], "t")?;
        let path = element.path.components().to_vec();
        self.table_mut_at(&path)?.rows = build_table_rows(&params.headers, &params.rows);
        Ok(json!({"docRevision": self.revision()}))
    }

    fn edit_image(&mut self, params: EditImageParams) -> QuillResult<Value> {
        let index = self.index();
        let element = index.require(&params.id)?;
        require_kind(element.kind, &[ElementKind::InlineImage], "ii")?;
        let path = element.path.components().to_vec();
        let (para_path, run_idx) = split_run_path(&path)?;

        let para = self.paragraph_mut_at(para_path)?;
        let Some(InlineRun::Image(image)) = para.runs.get_mut(run_idx) else {
            return Err(QuillError::Internal(format!(
                "index out of sync at {}",
                params.id
            )));
        };
        if let Some(width) = params.width {
            image.width = width;
        }
        if let Some(height) = params.height {
            image.height = height;
        }
        if let Some(alt) = params.alt {
            image.alt = Some(alt);
        }
        Ok(json!({"docRevision": self.revision()}))
    }

    fn delete_element(&mut self, params: DeleteParams) -> QuillResult<Value> {
        let index = self.index();
        let element = index.require(&params.id)?;
        let kind = element.kind;
        let path = element.path.components().to_vec();

        match kind {
            ElementKind::Document => {
                return Err(QuillError::Validation(
                    "the document root cannot be deleted".into(),
                ));
            }
            ElementKind::Section => {
                let s = path[0] as usize;
                if self.doc.sections.len() == 1 {
                    // The last section is cleared, never removed: a document
                    // always keeps at least one section.
                    self.section_mut(s)?.blocks.clear();
                } else {
                    let _ = self.doc.sections.remove(s);
                }
            }
            ElementKind::Paragraph => {
                if path.len() == 2 {
                    let s = path[0] as usize;
                    let b = path[1] as usize;
                    let _ = self.section_mut(s)?.blocks.remove(b);
                } else {
                    let (cell_path, p) = path.split_at(4);
                    let cell = self.cell_mut_at(cell_path)?;
                    let _ = cell.paragraphs.remove(p[0] as usize);
                }
            }
            ElementKind::Table => {
                let s = path[0] as usize;
                let b = path[1] as usize;
                let _ = self.section_mut(s)?.blocks.remove(b);
            }
            ElementKind::TableRow => {
                let r = path[2] as usize;
                let table = self.table_mut_at(&path[..2])?;
                let _ = table.rows.remove(r);
            }
            ElementKind::TableCell => {
                let c = path[3] as usize;
                let table = self.table_mut_at(&path[..2])?;
                let row = table
                    .rows
                    .get_mut(path[2] as usize)
                    .ok_or_else(|| QuillError::Internal("index out of sync".into()))?;
                let _ = row.cells.remove(c);
            }
            ElementKind::InlineText | ElementKind::InlineImage => {
                // Inline deletion clears the run's character range; the node
                // stays in place so sibling run IDs do not shift.
                let (para_path, run_idx) = split_run_path(&path)?;
                let para = self.paragraph_mut_at(para_path)?;
                match para.runs.get_mut(run_idx) {
                    Some(InlineRun::Text(tr)) => tr.text.clear(),
                    // An image occupies zero editable characters.
                    Some(InlineRun::Image(_)) => {}
                    None => return Err(QuillError::Internal("index out of sync".into())),
                }
            }
        }
        Ok(json!({"docRevision": self.revision()}))
    }

    fn set_table_header_text_style(&mut self, params: StyleParams) -> QuillResult<Value> {
        let index = self.index();
        let element = index.require(&params.id)?;
        require_kind(element.kind, &[ElementKind::Table], "t")?;
        let path = element.path.components().to_vec();

        let style = sanitize_style(&params.text_style);
        if !style.is_empty() {
            let table = self.table_mut_at(&path)?;
            if let Some(header) = table.rows.first_mut() {
                for cell in &mut header.cells {
                    for para in &mut cell.paragraphs {
                        style_whole_paragraph(para, &style)?;
                    }
                }
            }
        }
        Ok(json!({"docRevision": self.revision()}))
    }

    fn set_paragraph_text_style(&mut self, params: StyleParams) -> QuillResult<Value> {
        let style = sanitize_style(&params.text_style);
        // A payload whose every color was malformed is a no-op, not an error.
        if style.is_empty() {
            return Ok(json!({"docRevision": self.revision()}));
        }
        self.with_style_targets(&params.id, |para| style_whole_paragraph(para, &style), |run| {
            run.style.merge_from(&style);
            Ok(())
        })?;
        Ok(json!({"docRevision": self.revision()}))
    }

    fn adjust_paragraph_text_style(&mut self, params: AdjustParams) -> QuillResult<Value> {
        let delta = params.font_size_delta;
        self.with_style_targets(
            &params.id,
            |para| {
                adjust_paragraph_font(para, delta);
                Ok(())
            },
            |run| {
                run.style.font_size = Some(adjusted_size(run.style.font_size, delta));
                Ok(())
            },
        )?;
        Ok(json!({"docRevision": self.revision()}))
    }

    /// Resolve a style target (p, it, tr, tc) and apply the right callback
    /// to every paragraph or to the single run it names.
    fn with_style_targets(
        &mut self,
        id: &str,
        mut per_paragraph: impl FnMut(&mut Paragraph) -> QuillResult<()>,
        mut per_run: impl FnMut(&mut TextRun) -> QuillResult<()>,
    ) -> QuillResult<()> {
        let index = self.index();
        let element = index.require(id)?;
        let kind = element.kind;
        let path = element.path.components().to_vec();

        match kind {
            ElementKind::Paragraph => per_paragraph(self.paragraph_mut_at(&path)?),
            ElementKind::InlineText => {
                let (para_path, run_idx) = split_run_path(&path)?;
                let para = self.paragraph_mut_at(para_path)?;
                let Some(InlineRun::Text(run)) = para.runs.get_mut(run_idx) else {
                    return Err(QuillError::Internal(format!("index out of sync at {id}")));
                };
                per_run(run)
            }
            ElementKind::TableRow => {
                let r = path[2] as usize;
                let table = self.table_mut_at(&path[..2])?;
                let row = table
                    .rows
                    .get_mut(r)
                    .ok_or_else(|| QuillError::Internal("index out of sync".into()))?;
                for cell in &mut row.cells {
                    for para in &mut cell.paragraphs {
                        per_paragraph(para)?;
                    }
                }
                Ok(())
            }
            ElementKind::TableCell => {
                let cell = self.cell_mut_at(&path)?;
                for para in &mut cell.paragraphs {
                    per_paragraph(para)?;
                }
                Ok(())
            }
            other => Err(QuillError::UnsupportedKind {
                kind: other.as_str().to_owned(),
                accepted: STYLE_TARGET_PREFIXES.to_owned(),
            }),
        }
    }

    // ── Tree accessors ──────────────────────────────────────────────────────

    fn section_mut(&mut self, s: usize) -> QuillResult<&mut Section> {
        self.doc
            .sections
            .get_mut(s)
            .ok_or_else(|| QuillError::Internal("index out of sync".into()))
    }

    fn block_mut(&mut self, s: usize, b: usize) -> QuillResult<&mut Block> {
        self.section_mut(s)?
            .blocks
            .get_mut(b)
            .ok_or_else(|| QuillError::Internal("index out of sync".into()))
    }

    /// Paragraph at a path of depth 2 (top-level) or 5 (inside a cell).
    fn paragraph_mut_at(&mut self, path: &[u32]) -> QuillResult<&mut Paragraph> {
        match path.len() {
            2 => match self.block_mut(path[0] as usize, path[1] as usize)? {
                Block::Paragraph(para) => Ok(para),
                Block::Table(_) => Err(QuillError::Internal("index out of sync".into())),
            },
            5 => {
                let p = path[4] as usize;
                self.cell_mut_at(&path[..4])?
                    .paragraphs
                    .get_mut(p)
                    .ok_or_else(|| QuillError::Internal("index out of sync".into()))
            }
            _ => Err(QuillError::Internal(format!(
                "unexpected paragraph depth {}",
                path.len()
            ))),
        }
    }

    fn table_mut_at(&mut self, path: &[u32]) -> QuillResult<&mut Table> {
        match self.block_mut(path[0] as usize, path[1] as usize)? {
            Block::Table(table) => Ok(table),
            Block::Paragraph(_) => Err(QuillError::Internal("index out of sync".into())),
        }
    }

    /// Cell at a path of depth 4: `[section, block, row, cell]`.
    fn cell_mut_at(&mut self, path: &[u32]) -> QuillResult<&mut TableCell> {
        let r = path[2] as usize;
        let c = path[3] as usize;
        self.table_mut_at(&path[..2])?
            .rows
            .get_mut(r)
            .and_then(|row| row.cells.get_mut(c))
            .ok_or_else(|| QuillError::Internal("index out of sync".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_args<T: for<'de> Deserialize<'de>>(name: &str, args: Value) -> QuillResult<T> {
    serde_json::from_value(args)
        .map_err(|e| QuillError::Validation(format!("invalid arguments for {name}: {e}")))
}

fn require_kind(kind: ElementKind, accepted: &[ElementKind], prefixes: &str) -> QuillResult<()> {
    if accepted.contains(&kind) {
        Ok(())
    } else {
        Err(QuillError::UnsupportedKind {
            kind: kind.as_str().to_owned(),
            accepted: prefixes.to_owned(),
        })
    }
}

/// Drop malformed colors; normalize the rest to lowercase 6-hex.
fn sanitize_style(style: &TextStyle) -> TextStyle {
    let mut out = style.clone();
    out.color = out.color.as_deref().and_then(normalize_color);
    out
}

/// A run's position: its parent paragraph path plus the run index.
fn split_run_path(path: &[u32]) -> QuillResult<(&[u32], usize)> {
    match path.split_last() {
        Some((&last, parent)) if !parent.is_empty() => Ok((parent, last as usize)),
        _ => Err(QuillError::Internal("unexpected inline run path".into())),
    }
}

fn style_whole_paragraph(para: &mut Paragraph, style: &TextStyle) -> QuillResult<()> {
    let len = para.text_len();
    if len > 0 {
        para.apply_style_range(0, len, style)?;
    }
    Ok(())
}

fn adjusted_size(current: Option<f64>, delta: f64) -> f64 {
    let effective = current.unwrap_or(DEFAULT_FONT_SIZE) + delta;
    effective.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1)
}

fn adjust_paragraph_font(para: &mut Paragraph, delta: f64) {
    for run in &mut para.runs {
        if let InlineRun::Text(tr) = run {
            tr.style.font_size = Some(adjusted_size(tr.style.font_size, delta));
        }
    }
}

/// Build table rows padded to `max(headers, widest row, 1)` columns. A
/// non-empty header list becomes row 0.
fn build_table_rows(headers: &[String], rows: &[Vec<String>]) -> Vec<TableRow> {
    let cols = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0))
        .max(1);

    let mut out = Vec::with_capacity(rows.len() + 1);
    if !headers.is_empty() {
        out.push(padded_row(headers, cols));
    }
    for row in rows {
        out.push(padded_row(row, cols));
    }
    out
}

fn padded_row(texts: &[String], cols: usize) -> TableRow {
    let cells = (0..cols)
        .map(|i| TableCell::from_text(texts.get(i).cloned().unwrap_or_default()))
        .collect();
    TableRow { cells }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
