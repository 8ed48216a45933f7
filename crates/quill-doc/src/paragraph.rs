//! Paragraphs and inline runs, with character-offset edit operations.
//!
//! Character offsets address *text* content only: an image run occupies zero
//! editable characters and is never split or removed by a range edit. Image
//! placeholders surface in [`Paragraph::search_text`] so search can still
//! find them.

use quill_core::{QuillError, QuillResult};
use serde::{Deserialize, Serialize};

use crate::style::TextStyle;

/// A contiguous span of identically styled text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Run text.
    pub text: String,
    /// Style of every character in the run.
    #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
    pub style: TextStyle,
}

/// An inline image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRun {
    /// Display width in points.
    pub width: u32,
    /// Display height in points.
    pub height: u32,
    /// Alt text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl ImageRun {
    /// The search-text placeholder, e.g. `[image 320x200]`.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("[image {}x{}]", self.width, self.height)
    }
}

/// One inline run inside a paragraph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InlineRun {
    /// Styled text.
    Text(TextRun),
    /// Inline image.
    Image(ImageRun),
}

impl InlineRun {
    /// Build a text run.
    #[must_use]
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            style,
        })
    }

    /// The contained text run, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(run) => Some(run),
            Self::Image(_) => None,
        }
    }

    /// The contained image run, if any.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageRun> {
        match self {
            Self::Image(run) => Some(run),
            Self::Text(_) => None,
        }
    }
}

/// A paragraph: an ordered list of inline runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Inline runs in display order.
    pub runs: Vec<InlineRun>,
}

impl Paragraph {
    /// An empty paragraph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A paragraph holding a single text run.
    #[must_use]
    pub fn from_text(text: impl Into<String>, style: Option<TextStyle>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::new();
        }
        Self {
            runs: vec![InlineRun::text(text, style.unwrap_or_default())],
        }
    }

    /// Concatenated text of all text runs (the editable character space).
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .filter_map(InlineRun::as_text)
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Text as seen by search: text runs verbatim, images as placeholders.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                InlineRun::Text(tr) => tr.text.clone(),
                InlineRun::Image(img) => img.placeholder(),
            })
            .collect()
    }

    /// Number of editable characters.
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.runs
            .iter()
            .filter_map(InlineRun::as_text)
            .map(|run| run.text.chars().count())
            .sum()
    }

    /// Remove every run.
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Style inherited by text inserted at `offset`: the style of the first
    /// text run whose span reaches `offset`, or the default for an empty
    /// paragraph.
    #[must_use]
    fn style_at(&self, offset: usize) -> TextStyle {
        let mut cursor = 0;
        let mut last = None;
        for run in self.runs.iter().filter_map(InlineRun::as_text) {
            let run_end = cursor + run.text.chars().count();
            if offset <= run_end {
                return run.style.clone();
            }
            cursor = run_end;
            last = Some(&run.style);
        }
        last.cloned().unwrap_or_default()
    }

    /// Replace the character range `[start, end)` with `text`.
    ///
    /// The inserted text inherits the style at `start`, overlaid with the
    /// set fields of `style`. Formatting outside the range is preserved;
    /// image runs are never touched.
    ///
    /// Errors: `end < start` is a validation error; `end` past the editable
    /// length is a range error. Failed calls leave the paragraph unchanged.
    pub fn replace_range(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        style: Option<&TextStyle>,
    ) -> QuillResult<()> {
        let len = self.text_len();
        if end < start {
            return Err(QuillError::Validation(format!(
                "range end {end} precedes start {start}"
            )));
        }
        if end > len {
            return Err(QuillError::Range(format!(
                "range end {end} exceeds paragraph length {len}"
            )));
        }

        let mut insert_style = self.style_at(start);
        if let Some(patch) = style {
            insert_style.merge_from(patch);
        }

        let mut out: Vec<InlineRun> = Vec::with_capacity(self.runs.len() + 1);
        let mut cursor = 0;
        let mut inserted = false;

        for run in self.runs.drain(..) {
            let InlineRun::Text(tr) = run else {
                out.push(run);
                continue;
            };
            let run_len = tr.text.chars().count();
            let run_start = cursor;
            let run_end = cursor + run_len;

            if run_start < start {
                let keep = start.min(run_end) - run_start;
                let kept: String = tr.text.chars().take(keep).collect();
                if !kept.is_empty() {
                    out.push(InlineRun::text(kept, tr.style.clone()));
                }
            }
            if !inserted && start <= run_end {
                if !text.is_empty() {
                    out.push(InlineRun::text(text, insert_style.clone()));
                }
                inserted = true;
            }
            if run_end > end {
                let skip = end.max(run_start) - run_start;
                let kept: String = tr.text.chars().skip(skip).collect();
                if !kept.is_empty() {
                    out.push(InlineRun::text(kept, tr.style));
                }
            }
            cursor = run_end;
        }
        if !inserted && !text.is_empty() {
            out.push(InlineRun::text(text, insert_style));
        }

        self.runs = out;
        self.coalesce();
        Ok(())
    }

    /// Overlay the set fields of `style` onto every character in
    /// `[start, end)`, splitting runs at the boundaries.
    pub fn apply_style_range(
        &mut self,
        start: usize,
        end: usize,
        style: &TextStyle,
    ) -> QuillResult<()> {
        let len = self.text_len();
        if end < start {
            return Err(QuillError::Validation(format!(
                "range end {end} precedes start {start}"
            )));
        }
        if end > len {
            return Err(QuillError::Range(format!(
                "range end {end} exceeds paragraph length {len}"
            )));
        }
        if start == end || style.is_empty() {
            return Ok(());
        }

        let mut out: Vec<InlineRun> = Vec::with_capacity(self.runs.len() + 2);
        let mut cursor = 0;

        for run in self.runs.drain(..) {
            let InlineRun::Text(tr) = run else {
                out.push(run);
                continue;
            };
            let run_len = tr.text.chars().count();
            let run_start = cursor;
            let run_end = cursor + run_len;
            cursor = run_end;

            let mid_start = start.clamp(run_start, run_end);
            let mid_end = end.clamp(run_start, run_end);

            let chars: Vec<char> = tr.text.chars().collect();
            let slice = |from: usize, to: usize| -> String {
                chars[from - run_start..to - run_start].iter().collect()
            };

            if mid_start > run_start {
                out.push(InlineRun::text(slice(run_start, mid_start), tr.style.clone()));
            }
            if mid_end > mid_start {
                out.push(InlineRun::text(
                    slice(mid_start, mid_end),
                    tr.style.merged(style),
                ));
            }
            if run_end > mid_end {
                out.push(InlineRun::text(slice(mid_end, run_end), tr.style));
            }
        }

        self.runs = out;
        self.coalesce();
        Ok(())
    }

    /// Merge adjacent text runs with identical styles and drop empty ones.
    fn coalesce(&mut self) {
        let mut out: Vec<InlineRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match run {
                InlineRun::Text(tr) if tr.text.is_empty() => {}
                InlineRun::Text(tr) => {
                    if let Some(InlineRun::Text(prev)) = out.last_mut() {
                        if prev.style == tr.style {
                            prev.text.push_str(&tr.text);
                            continue;
                        }
                    }
                    out.push(InlineRun::Text(tr));
                }
                image => out.push(image),
            }
        }
        self.runs = out;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn bold() -> TextStyle {
        TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        }
    }

    fn italic() -> TextStyle {
        TextStyle {
            italic: Some(true),
            ..TextStyle::default()
        }
    }

    fn styled_paragraph() -> Paragraph {
        Paragraph {
            runs: vec![
                InlineRun::text("Hello ", bold()),
                InlineRun::text("cruel ", TextStyle::default()),
                InlineRun::text("world", italic()),
            ],
        }
    }

    #[test]
    fn plain_text_concatenates_runs() {
        assert_eq!(styled_paragraph().plain_text(), "Hello cruel world");
        assert_eq!(styled_paragraph().text_len(), 17);
    }

    #[test]
    fn images_are_invisible_to_plain_text_but_not_search() {
        let para = Paragraph {
            runs: vec![
                InlineRun::text("see ", TextStyle::default()),
                InlineRun::Image(ImageRun {
                    width: 320,
                    height: 200,
                    alt: None,
                }),
            ],
        };
        assert_eq!(para.plain_text(), "see ");
        assert_eq!(para.text_len(), 4);
        assert_eq!(para.search_text(), "see [image 320x200]");
    }

    #[test]
    fn replace_range_round_trip() {
        let mut para = styled_paragraph();
        para.replace_range(6, 11, "kind", None).unwrap();
        assert_eq!(para.plain_text(), "Hello kindworld");
    }

    #[test]
    fn replace_preserves_styles_outside_range() {
        let mut para = styled_paragraph();
        para.replace_range(6, 12, "", None).unwrap();
        assert_eq!(para.plain_text(), "Hello world");
        let first = para.runs[0].as_text().unwrap();
        assert_eq!(first.text, "Hello ");
        assert_eq!(first.style, bold());
        let last = para.runs.last().unwrap().as_text().unwrap();
        assert_eq!(last.text, "world");
        assert_eq!(last.style, italic());
    }

    #[test]
    fn inserted_text_inherits_style_at_start() {
        let mut para = styled_paragraph();
        // Insertion inside the bold run.
        para.replace_range(2, 2, "XX", None).unwrap();
        assert_eq!(para.plain_text(), "HeXXllo cruel world");
        // Coalesced back into the single bold run.
        assert_eq!(para.runs[0].as_text().unwrap().text, "HeXXllo ");
        assert_eq!(para.runs[0].as_text().unwrap().style, bold());
    }

    #[test]
    fn style_override_applies_only_to_inserted_text() {
        let mut para = Paragraph::from_text("abcdef", None);
        para.replace_range(3, 3, "XYZ", Some(&bold())).unwrap();
        assert_eq!(para.plain_text(), "abcXYZdef");
        assert_eq!(para.runs.len(), 3);
        assert_eq!(para.runs[1].as_text().unwrap().style, bold());
        assert!(para.runs[0].as_text().unwrap().style.is_empty());
        assert!(para.runs[2].as_text().unwrap().style.is_empty());
    }

    #[test]
    fn replace_at_end_appends() {
        let mut para = Paragraph::from_text("abc", Some(bold()));
        para.replace_range(3, 3, "def", None).unwrap();
        assert_eq!(para.plain_text(), "abcdef");
        // Appended text inherits the trailing run's style.
        assert_eq!(para.runs.len(), 1);
        assert_eq!(para.runs[0].as_text().unwrap().style, bold());
    }

    #[test]
    fn replace_into_empty_paragraph() {
        let mut para = Paragraph::new();
        para.replace_range(0, 0, "hello", None).unwrap();
        assert_eq!(para.plain_text(), "hello");
    }

    #[test]
    fn range_exceeding_length_is_a_range_error() {
        let mut para = Paragraph::from_text("short", None);
        let err = para.replace_range(0, 40, "x", None).unwrap_err();
        assert_matches!(err, QuillError::Range(_));
        // Unchanged on failure.
        assert_eq!(para.plain_text(), "short");
    }

    #[test]
    fn inverted_range_is_a_validation_error() {
        let mut para = Paragraph::from_text("short", None);
        let err = para.replace_range(3, 1, "x", None).unwrap_err();
        assert_matches!(err, QuillError::Validation(_));
    }

    #[test]
    fn replace_does_not_disturb_images() {
        let mut para = Paragraph {
            runs: vec![
                InlineRun::text("ab", TextStyle::default()),
                InlineRun::Image(ImageRun {
                    width: 10,
                    height: 10,
                    alt: None,
                }),
                InlineRun::text("cd", TextStyle::default()),
            ],
        };
        para.replace_range(1, 3, "-", None).unwrap();
        assert_eq!(para.plain_text(), "a-d");
        assert!(para.runs.iter().any(|r| r.as_image().is_some()));
    }

    #[test]
    fn apply_style_splits_runs_at_boundaries() {
        let mut para = Paragraph::from_text("abcdef", None);
        para.apply_style_range(2, 4, &bold()).unwrap();
        assert_eq!(para.runs.len(), 3);
        assert_eq!(para.runs[1].as_text().unwrap().text, "cd");
        assert_eq!(para.runs[1].as_text().unwrap().style, bold());
        assert_eq!(para.plain_text(), "abcdef");
    }

    #[test]
    fn apply_style_merges_over_existing_fields() {
        let mut para = Paragraph::from_text("abcd", Some(bold()));
        para.apply_style_range(0, 2, &italic()).unwrap();
        let first = para.runs[0].as_text().unwrap();
        assert_eq!(first.style.bold, Some(true));
        assert_eq!(first.style.italic, Some(true));
        let second = para.runs[1].as_text().unwrap();
        assert_eq!(second.style, bold());
    }

    #[test]
    fn apply_style_empty_range_is_noop() {
        let mut para = styled_paragraph();
        let before = para.clone();
        para.apply_style_range(3, 3, &bold()).unwrap();
        assert_eq!(para, before);
    }

    #[test]
    fn apply_style_validates_bounds() {
        let mut para = Paragraph::from_text("abc", None);
        assert_matches!(
            para.apply_style_range(0, 9, &bold()).unwrap_err(),
            QuillError::Range(_)
        );
        assert_matches!(
            para.apply_style_range(2, 1, &bold()).unwrap_err(),
            QuillError::Validation(_)
        );
    }

    #[test]
    fn clear_removes_all_runs() {
        let mut para = styled_paragraph();
        para.clear();
        assert!(para.runs.is_empty());
        assert_eq!(para.text_len(), 0);
    }
}
