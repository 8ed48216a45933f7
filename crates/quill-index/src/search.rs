//! Ranked search over indexed elements.
//!
//! Scoring is Okapi BM25 plus a flat phrase bonus, a proximity bonus, and
//! multiplicative priors. An explicit regex pattern bypasses ranking and
//! tests every candidate exhaustively. Exact-phrase queries against inline
//! text additionally fuse paragraph-level phrase matches back onto the
//! inline runs they overlap, so a phrase split across styled runs is still
//! found.

use std::collections::{HashMap, HashSet};

use quill_core::{ElementKind, PositionPath, QuillError, QuillResult};
use quill_core::text::truncate_with_suffix;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::element::IndexedElement;

/// BM25 term-frequency saturation.
pub const BM25_K1: f64 = 1.2;
/// BM25 length normalization.
pub const BM25_B: f64 = 0.75;
/// Flat bonus when the query is a literal substring of the element text.
pub const PHRASE_BONUS: f64 = 6.0;
/// Scores below `max(min_score, EPSILON)` are discarded.
pub const SCORE_EPSILON: f64 = 1e-9;
/// Characters kept on each side of a snippet match.
pub const SNIPPET_RADIUS: usize = 45;
/// Hard cap on snippet length.
pub const SNIPPET_MAX_CHARS: usize = 120;
/// Maximum snippets per hit.
pub const MAX_SNIPPETS: usize = 4;
/// Default result-page size.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Which score components contribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Phrase bonus only.
    ExactPhrase,
    /// BM25 only.
    Keyword,
    /// BM25 + phrase + proximity.
    #[default]
    Hybrid,
}

/// A search request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Query text (tokenized for ranking, matched literally for phrases).
    #[serde(default)]
    pub query: String,
    /// Scoring mode.
    #[serde(default)]
    pub mode: SearchMode,
    /// Restrict results to these kinds; `None` allows every kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<ElementKind>>,
    /// Maximum hits returned.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Minimum final score; clamped up to [`SCORE_EPSILON`].
    #[serde(default)]
    pub min_score: f64,
    /// Explicit regex pattern; takes the exhaustive path when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Case-sensitive regex matching.
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            mode: SearchMode::default(),
            kinds: None,
            max_results: DEFAULT_MAX_RESULTS,
            min_score: 0.0,
            regex: None,
            case_sensitive: false,
        }
    }
}

impl SearchQuery {
    /// A hybrid query over all kinds.
    #[must_use]
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Set the scoring mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restrict the kinds searched.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<ElementKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }
}

/// Per-component score breakdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Okapi BM25 over the query terms.
    pub bm25: f64,
    /// Literal-substring bonus.
    pub phrase: f64,
    /// Term-proximity bonus.
    pub proximity: f64,
    /// Kind prior (reserved, currently 1).
    pub kind_prior: f64,
    /// Position prior favoring earlier elements.
    pub position_prior: f64,
}

/// One search result.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Element ID.
    pub id: String,
    /// Element kind.
    pub kind: ElementKind,
    /// Final score.
    pub score: f64,
    /// Component breakdown.
    pub breakdown: ScoreBreakdown,
    /// Element preview.
    pub preview: String,
    /// Contextual snippets around the matches.
    pub snippets: Vec<String>,
}

struct Entry {
    element: IndexedElement,
    /// Char-wise case-folded text; aligned 1:1 with the original chars.
    folded: Vec<char>,
    term_freq: HashMap<String, usize>,
    positions: HashMap<String, Vec<usize>>,
    token_count: usize,
}

/// Ranked search index over one snapshot of indexed elements.
#[derive(Default)]
pub struct SearchIndex {
    entries: Vec<Entry>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
}

impl SearchIndex {
    /// Build the index from elements in document order.
    #[must_use]
    pub fn rebuild(elements: &[IndexedElement]) -> Self {
        let mut entries = Vec::with_capacity(elements.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for element in elements {
            let folded = fold_case(&element.search_text);
            let tokens = tokenize(&element.search_text);
            let mut term_freq: HashMap<String, usize> = HashMap::new();
            let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
            for (pos, token) in tokens.iter().enumerate() {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
                positions.entry(token.clone()).or_default().push(pos);
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_tokens += tokens.len();
            entries.push(Entry {
                element: element.clone(),
                folded,
                term_freq,
                positions,
                token_count: tokens.len(),
            });
        }

        let avg_len = if entries.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                total_tokens as f64 / entries.len() as f64
            }
        };
        Self {
            entries,
            doc_freq,
            avg_len,
        }
    }

    /// Run a query against the current snapshot.
    pub fn search(&self, query: &SearchQuery) -> QuillResult<Vec<SearchHit>> {
        let threshold = query.min_score.max(SCORE_EPSILON);
        let allowed = |kind: ElementKind| -> bool {
            query.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind))
        };

        let mut ranked: Vec<(PositionPath, SearchHit)> = if let Some(pattern) = &query.regex {
            self.regex_search(pattern, query.case_sensitive, &allowed)?
        } else {
            self.ranked_search(query, &allowed)
        };

        ranked.retain(|(_, hit)| hit.score >= threshold);
        ranked.sort_by(|(pa, a), (pb, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| pa.cmp(pb))
        });
        ranked.truncate(query.max_results);
        Ok(ranked.into_iter().map(|(_, hit)| hit).collect())
    }

    fn regex_search(
        &self,
        pattern: &str,
        case_sensitive: bool,
        allowed: &dyn Fn(ElementKind) -> bool,
    ) -> QuillResult<Vec<(PositionPath, SearchHit)>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| QuillError::Validation(format!("invalid regex: {e}")))?;

        let mut hits = Vec::new();
        for entry in &self.entries {
            if !allowed(entry.element.kind) {
                continue;
            }
            let Some(m) = re.find(&entry.element.search_text) else {
                continue;
            };
            let match_start = entry.element.search_text[..m.start()].chars().count();
            let match_len = m.as_str().chars().count();
            let snippet = window_snippet(&entry.element.search_text, match_start, match_len);
            hits.push((
                entry.element.path.clone(),
                SearchHit {
                    id: entry.element.id.clone(),
                    kind: entry.element.kind,
                    score: 1.0,
                    breakdown: ScoreBreakdown::default(),
                    preview: entry.element.preview.clone(),
                    snippets: vec![snippet],
                },
            ));
        }
        Ok(hits)
    }

    fn ranked_search(
        &self,
        query: &SearchQuery,
        allowed: &dyn Fn(ElementKind) -> bool,
    ) -> Vec<(PositionPath, SearchHit)> {
        let terms = dedup_terms(&tokenize(&query.query));
        let phrase: Vec<char> = fold_case(query.query.trim());

        let fuse_inline = query.mode == SearchMode::ExactPhrase
            && terms.len() >= 2
            && allowed(ElementKind::InlineText);

        let mut hits = Vec::new();
        for entry in &self.entries {
            if !allowed(entry.element.kind) {
                continue;
            }
            // Fusion replaces the ranked pass for inline text so a run is
            // never reported twice.
            if fuse_inline && entry.element.kind == ElementKind::InlineText {
                continue;
            }
            if let Some(hit) = self.score_entry(entry, &terms, &phrase, query.mode) {
                hits.push((entry.element.path.clone(), hit));
            }
        }
        if fuse_inline {
            hits.extend(self.fuse_inline_phrase(&phrase));
        }
        hits
    }

    fn score_entry(
        &self,
        entry: &Entry,
        terms: &[String],
        phrase: &[char],
        mode: SearchMode,
    ) -> Option<SearchHit> {
        let bm25 = self.bm25(entry, terms);
        let phrase_score = if !phrase.is_empty() && contains_chars(&entry.folded, phrase) {
            PHRASE_BONUS
        } else {
            0.0
        };
        let proximity = proximity_bonus(entry, terms);
        let base = match mode {
            SearchMode::ExactPhrase => phrase_score,
            SearchMode::Keyword => bm25,
            SearchMode::Hybrid => bm25 + phrase_score + proximity,
        };
        if base <= 0.0 {
            return None;
        }

        let kind_prior = 1.0;
        let position_prior = position_prior(&entry.element.path);
        let score = base * kind_prior * position_prior;
        let snippets = build_snippets(entry, terms, phrase, phrase_score > 0.0);
        Some(SearchHit {
            id: entry.element.id.clone(),
            kind: entry.element.kind,
            score,
            breakdown: ScoreBreakdown {
                bm25,
                phrase: phrase_score,
                proximity,
                kind_prior,
                position_prior,
            },
            preview: entry.element.preview.clone(),
            snippets,
        })
    }

    fn bm25(&self, entry: &Entry, terms: &[String]) -> f64 {
        if entry.token_count == 0 || self.avg_len == 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.entries.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let len_ratio = entry.token_count as f64 / self.avg_len;
        let mut score = 0.0;
        for term in terms {
            let Some(&tf) = entry.term_freq.get(term) else {
                continue;
            };
            #[allow(clippy::cast_precision_loss)]
            let tf = tf as f64;
            #[allow(clippy::cast_precision_loss)]
            let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len_ratio);
            score += idf * tf * (BM25_K1 + 1.0) / denom;
        }
        score
    }

    /// Exact-phrase fusion: locate the phrase in each paragraph's text and
    /// report every inline-text run overlapping an occurrence.
    fn fuse_inline_phrase(&self, phrase: &[char]) -> Vec<(PositionPath, SearchHit)> {
        let mut hits = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for para in &self.entries {
            if para.element.kind != ElementKind::Paragraph {
                continue;
            }
            let occurrences = find_occurrences(&para.folded, phrase);
            if occurrences.is_empty() {
                continue;
            }
            // Child runs in order, with their char spans within the
            // paragraph text.
            let mut cursor = 0usize;
            for run in self
                .entries
                .iter()
                .filter(|e| e.element.parent_id.as_deref() == Some(&para.element.id))
            {
                let run_len = run.element.search_text.chars().count();
                let span = (cursor, cursor + run_len);
                cursor += run_len;
                if run.element.kind != ElementKind::InlineText {
                    continue;
                }
                let overlaps = occurrences
                    .iter()
                    .any(|&(start, end)| start < span.1 && end > span.0);
                if !overlaps || !seen.insert(run.element.id.clone()) {
                    continue;
                }
                let position_prior = position_prior(&run.element.path);
                hits.push((
                    run.element.path.clone(),
                    SearchHit {
                        id: run.element.id.clone(),
                        kind: ElementKind::InlineText,
                        score: PHRASE_BONUS * position_prior,
                        breakdown: ScoreBreakdown {
                            phrase: PHRASE_BONUS,
                            kind_prior: 1.0,
                            position_prior,
                            ..ScoreBreakdown::default()
                        },
                        preview: run.element.preview.clone(),
                        snippets: vec![truncate_with_suffix(
                            &run.element.search_text,
                            SNIPPET_MAX_CHARS,
                        )],
                    },
                ));
            }
        }
        hits
    }
}

/// Lowercase alphanumeric-run tokenization.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Char-wise case fold, keeping the char count aligned with the input.
fn fold_case(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn dedup_terms(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|t| seen.insert((*t).clone()))
        .cloned()
        .collect()
}

fn contains_chars(haystack: &[char], needle: &[char]) -> bool {
    !find_occurrences_limited(haystack, needle, 1).is_empty()
}

fn find_occurrences(haystack: &[char], needle: &[char]) -> Vec<(usize, usize)> {
    find_occurrences_limited(haystack, needle, usize::MAX)
}

fn find_occurrences_limited(
    haystack: &[char],
    needle: &[char],
    limit: usize,
) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return out;
    }
    for start in 0..=(haystack.len() - needle.len()) {
        if &haystack[start..start + needle.len()] == needle {
            out.push((start, start + needle.len()));
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

/// `1 / (1 + 0.005 * (1000 * section + block))` — earlier content ranks
/// slightly higher.
fn position_prior(path: &PositionPath) -> f64 {
    let components = path.components();
    let section = components.first().copied().unwrap_or(0);
    let block = components.get(1).copied().unwrap_or(0);
    let linear = f64::from(section).mul_add(1000.0, f64::from(block));
    1.0 / linear.mul_add(0.005, 1.0)
}

/// Minimum pairwise distance bonus: `3 / (1 + minDist)` when at least two
/// distinct query terms occur in the element.
fn proximity_bonus(entry: &Entry, terms: &[String]) -> f64 {
    let present: Vec<&Vec<usize>> = terms
        .iter()
        .filter_map(|t| entry.positions.get(t))
        .collect();
    if present.len() < 2 {
        return 0.0;
    }
    let mut min_dist = usize::MAX;
    for (i, a) in present.iter().enumerate() {
        for b in &present[i + 1..] {
            for &pa in *a {
                for &pb in *b {
                    min_dist = min_dist.min(pa.abs_diff(pb));
                }
            }
        }
    }
    #[allow(clippy::cast_precision_loss)]
    {
        3.0 / (1.0 + min_dist as f64)
    }
}

fn build_snippets(
    entry: &Entry,
    terms: &[String],
    phrase: &[char],
    phrase_matched: bool,
) -> Vec<String> {
    let mut needles: Vec<Vec<char>> = Vec::new();
    if phrase_matched {
        needles.push(phrase.to_vec());
    }
    let mut added = 0;
    for term in terms {
        if added == 3 {
            break;
        }
        if entry.term_freq.contains_key(term) {
            needles.push(term.chars().collect());
            added += 1;
        }
    }

    let mut snippets = Vec::new();
    for needle in needles {
        if snippets.len() == MAX_SNIPPETS {
            break;
        }
        let Some(&(start, _)) = find_occurrences_limited(&entry.folded, &needle, 1).first()
        else {
            continue;
        };
        let snippet = window_snippet(&entry.element.search_text, start, needle.len());
        if !snippets.contains(&snippet) {
            snippets.push(snippet);
        }
    }
    snippets
}

/// Extract `±SNIPPET_RADIUS` chars around `[start, start + len)` and cap the
/// result length.
fn window_snippet(text: &str, start: usize, len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let from = start.saturating_sub(SNIPPET_RADIUS);
    let to = (start + len + SNIPPET_RADIUS).min(chars.len());
    let window: String = chars[from..to].iter().collect();
    truncate_with_suffix(&window, SNIPPET_MAX_CHARS)
}
