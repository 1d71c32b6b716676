//! Heading localisation by an ordered cascade of patterns.
//!
//! Papers phrase their headings inconsistently, so each locator is a list of
//! [`LocatorRule`]s ordered from the most canonical phrasing to the most
//! generic. The first rule that matches anywhere in the text wins and its
//! window is cut from the match start. Matching is case-insensitive.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::normalize::char_window;

pub const METHODOLOGY_WINDOW: usize = 4000;
pub const TECHNICAL_WINDOW: usize = 4500;
pub const RESULTS_WINDOW: usize = 3500;
pub const KEYWORD_WINDOW: usize = 2000;

const METHODOLOGY_PATTERNS: &[&str] = &[
    r"iii\.\s*(proposed\s+)?methodology",
    r"3\.\s*(proposed\s+)?methodology",
    r"\bmethodology\b",
    r"\bmethods\b",
    r"\bapproach\b",
    r"\barchitecture\b",
    r"\bframework\b",
];

const TECHNICAL_EXTRA_PATTERNS: &[&str] = &[
    r"\bmodel\s+overview\b",
    r"\bsystem\s+overview\b",
    r"\bproposed\s+system\b",
    r"\bproposed\s+work\b",
    r"\bmodel\s+architecture\b",
    r"\bsystem\s+architecture\b",
];

const RESULTS_PATTERNS: &[&str] = &["results", "evaluation", "performance"];

#[derive(Debug, Clone)]
pub struct LocatorRule {
    pattern: Regex,
    window: usize,
}

impl LocatorRule {
    pub fn new(pattern: &str, window: usize) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(&format!("(?i){pattern}"))?,
            window,
        })
    }
}

/// A window of text cut from the first matching heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedSection {
    /// Position of the winning rule in the cascade.
    pub rule: usize,
    /// The heading text as it appears in the document.
    pub heading: String,
    /// Byte offset of the heading in the searched text.
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SectionLocator {
    rules: Vec<LocatorRule>,
}

impl SectionLocator {
    pub fn new(rules: Vec<LocatorRule>) -> Self {
        Self { rules }
    }

    /// Build a cascade where every pattern shares the same window length.
    pub fn from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>, window: usize) -> Result<Self> {
        let rules = patterns
            .into_iter()
            .map(|pattern| LocatorRule::new(pattern, window))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Methodology headings only, 4000-character window.
    pub fn methodology() -> Self {
        Self::builtin(METHODOLOGY_PATTERNS.iter().copied(), METHODOLOGY_WINDOW)
    }

    /// Methodology headings extended with system/model overview phrasings,
    /// 4500-character window.
    pub fn technical() -> Self {
        Self::builtin(
            METHODOLOGY_PATTERNS
                .iter()
                .chain(TECHNICAL_EXTRA_PATTERNS)
                .copied(),
            TECHNICAL_WINDOW,
        )
    }

    /// "results", "evaluation" or "performance" anywhere, 3500-character window.
    pub fn results() -> Self {
        Self::builtin(RESULTS_PATTERNS.iter().copied(), RESULTS_WINDOW)
    }

    /// A single keyword anchor such as `abstract`, optionally followed by
    /// `:`, `-` or an em dash.
    pub fn keyword(keyword: &str, window: usize) -> Self {
        let pattern = format!(r"{}\b[:\-—]?", regex::escape(keyword));
        Self::builtin(std::iter::once(pattern.as_str()), window)
    }

    fn builtin<'a>(patterns: impl IntoIterator<Item = &'a str>, window: usize) -> Self {
        Self::from_patterns(patterns, window).expect("built-in heading patterns compile")
    }

    /// Try each rule in order; `None` when nothing matches anywhere.
    pub fn locate(&self, text: &str) -> Option<LocatedSection> {
        self.rules.iter().enumerate().find_map(|(rule, candidate)| {
            candidate.pattern.find(text).map(|m| LocatedSection {
                rule,
                heading: m.as_str().to_string(),
                offset: m.start(),
                text: char_window(text, m.start(), candidate.window),
            })
        })
    }

    /// The located window, or an empty string when nothing matched.
    pub fn locate_text(&self, text: &str) -> String {
        self.locate(text).map(|section| section.text).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_yields_nothing() {
        let text = "An essay about gardening, weather and cooking.";
        assert!(SectionLocator::technical().locate(text).is_none());
        assert_eq!(SectionLocator::methodology().locate_text(text), "");
    }

    #[test]
    fn window_starts_at_heading() {
        let prefix = "Introduction text. ".repeat(10);
        let body = "z".repeat(5000);
        let text = format!("{prefix}Methodology\n{body}");
        let position = prefix.len();

        let section = SectionLocator::methodology().locate(&text).unwrap();

        assert_eq!(section.offset, position);
        assert_eq!(section.heading, "Methodology");
        assert!(section.text.starts_with("Methodology"));
        assert_eq!(section.text.chars().count(), METHODOLOGY_WINDOW);
        assert_eq!(
            SectionLocator::technical().locate_text(&text).chars().count(),
            TECHNICAL_WINDOW
        );
    }

    #[test]
    fn earlier_rule_wins_over_earlier_position() {
        // "framework" appears first in the text but "3. proposed methodology"
        // sits higher in the cascade.
        let text = "Our framework is simple.\n3. Proposed Methodology\nWe train a model.";
        let section = SectionLocator::technical().locate(text).unwrap();
        assert_eq!(section.rule, 1);
        assert!(section.text.starts_with("3. Proposed Methodology"));
    }

    #[test]
    fn word_boundaries_are_respected() {
        // "approaches" must not satisfy \bapproach\b.
        let text = "Several approaches exist. Our system overview follows.";
        let section = SectionLocator::technical().locate(text).unwrap();
        assert_eq!(section.heading, "system overview");
    }

    #[test]
    fn short_text_gives_short_window() {
        let section = SectionLocator::results().locate("Evaluation: 93% accuracy").unwrap();
        assert_eq!(section.text, "Evaluation: 93% accuracy");
    }

    #[test]
    fn keyword_locator_matches_with_suffix() {
        let text = "Title\nABSTRACT— We study graphs.\nIntroduction: Graphs are everywhere.";
        let section = SectionLocator::keyword("abstract", KEYWORD_WINDOW).locate(text).unwrap();
        assert_eq!(section.heading, "ABSTRACT—");
        assert!(section.text.starts_with("ABSTRACT— We study graphs."));
    }

    #[test]
    fn custom_rules_keep_their_own_windows() {
        let locator = SectionLocator::new(vec![
            LocatorRule::new(r"\bdiscussion\b", 5).unwrap(),
            LocatorRule::new(r"\bsummary\b", 7).unwrap(),
        ]);
        assert_eq!(locator.locate_text("In summary, it works."), "summary");
        assert!(LocatorRule::new("(unclosed", 10).is_err());
    }
}
