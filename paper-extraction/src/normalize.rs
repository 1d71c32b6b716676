//! Cleanup for text pulled out of PDF pages.
//!
//! PDF text layers break words across lines with a trailing hyphen, pad
//! columns with runs of spaces and tabs, and separate blocks with stacks of
//! empty lines. [`normalize_text`] folds all of that into a compact form
//! that the locators and the classifier can work on.

use regex::Regex;
use std::sync::LazyLock;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("blank line pattern compiles"));

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("whitespace pattern compiles"));

/// Normalize raw page (or whole document) text.
///
/// In order: joins hyphenated line breaks (`word-\n` becomes `word`),
/// collapses runs of newlines to one, collapses horizontal whitespace to a
/// single space and trims both ends. Total over every input, including the
/// empty string, and idempotent.
pub fn normalize_text(raw: &str) -> String {
    let mut text = raw.to_string();

    // "a--\n" joins to "a-" followed by the next line break, so repeat until stable.
    while text.contains("-\n") {
        text = text.replace("-\n", "");
    }

    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = HORIZONTAL_WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Up to `max_chars` characters of `text`, starting at byte offset `start`.
pub(crate) fn char_window(text: &str, start: usize, max_chars: usize) -> String {
    text.get(start..)
        .map(|tail| tail.chars().take(max_chars).collect())
        .unwrap_or_default()
}

/// The first `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
