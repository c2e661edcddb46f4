//! String utilities shared across the pipeline.
//!
//! Message text and article bodies are mostly Korean, so every truncation
//! helper here counts characters, never bytes. Slicing on a byte index
//! would panic mid-codepoint on CJK text.

/// Truncate a string to at most `max` characters.
///
/// Returns the original string unchanged when it is already short enough.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count
/// of the characters removed.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", truncate_chars(s, max), total - max)
    }
}

/// Collapse raw text into non-blank trimmed lines joined with single newlines.
pub fn collapse_lines(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
