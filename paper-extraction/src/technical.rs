//! Selection of the technical text window.
//!
//! Two sources, strictly in order: the extended heading cascade run over the
//! whole document (free, and usually right for well-structured papers), then
//! page-by-page role classification (one oracle call per page) for papers
//! whose headings defeat every pattern. Exactly one source is used.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunker::chunk_pages;
use crate::classifier::ChunkRoleClassifier;
use crate::document::PageText;
use crate::locator::SectionLocator;
use crate::normalize::truncate_chars;
use crate::oracle::OracleError;

/// Upper bound on classifier-selected text handed to the oracle.
pub const SEMANTIC_TEXT_CAP: usize = 6000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TechnicalSource {
    Heading { heading: String, offset: usize },
    Semantic { pages: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalText {
    pub source: TechnicalSource,
    pub text: String,
}

#[derive(Clone)]
pub struct TechnicalTextExtractor {
    locator: SectionLocator,
    classifier: ChunkRoleClassifier,
}

impl TechnicalTextExtractor {
    pub fn new(classifier: ChunkRoleClassifier) -> Self {
        Self::with_locator(SectionLocator::technical(), classifier)
    }

    pub fn with_locator(locator: SectionLocator, classifier: ChunkRoleClassifier) -> Self {
        Self {
            locator,
            classifier,
        }
    }

    /// `full_text` is the normalized whole-document text, `pages` the raw
    /// page texts used for the classifier fallback. `Ok(None)` means neither
    /// source produced anything; an error means the fallback ran but the
    /// oracle answered none of its calls.
    pub async fn extract(
        &self,
        full_text: &str,
        pages: &[PageText],
    ) -> Result<Option<TechnicalText>, OracleError> {
        if let Some(section) = self.locator.locate(full_text) {
            info!(
                heading = %section.heading,
                rule = section.rule,
                chars = section.text.chars().count(),
                "Technical text located by heading"
            );
            return Ok(Some(TechnicalText {
                source: TechnicalSource::Heading {
                    heading: section.heading,
                    offset: section.offset,
                },
                text: section.text,
            }));
        }

        let chunks = chunk_pages(pages);
        info!(
            chunks = chunks.len(),
            "No technical heading found, classifying page chunks"
        );

        let classification = self.classifier.classify_chunks(chunks).await;
        if classification.all_failed() {
            if let Some(error) = classification.last_error {
                warn!(failed = classification.failed, error = %error, "Oracle answered no classification call");
                return Err(error);
            }
        }

        let selected: Vec<_> = classification
            .chunks
            .into_iter()
            .filter(|chunk| chunk.role.is_technical())
            .collect();

        let pages = selected.iter().map(|chunk| chunk.page).collect::<Vec<_>>();
        let combined = selected
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = truncate_chars(&combined, SEMANTIC_TEXT_CAP);

        if text.is_empty() {
            warn!("No technical content found by heading or classification");
            return Ok(None);
        }

        info!(?pages, chars = text.chars().count(), "Technical text assembled from classified chunks");
        Ok(Some(TechnicalText {
            source: TechnicalSource::Semantic { pages },
            text,
        }))
    }
}
