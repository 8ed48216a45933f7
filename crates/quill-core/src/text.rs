//! Small text helpers shared by previews and snippets.

/// Truncate to at most `max_chars` characters, appending `…` when cut.
///
/// Operates on char boundaries, never bytes. The ellipsis counts toward the
/// limit, so output length never exceeds `max_chars`.
#[must_use]
pub fn truncate_with_suffix(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

/// Collapse runs of whitespace to single spaces and trim the ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
