use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunker::PageChunk;
use crate::normalize::truncate_chars;
use crate::oracle::{Oracle, OracleError};

/// Only this much of a chunk is sent to the oracle.
pub const CLASSIFIER_INPUT_CHARS: usize = 1500;

/// Rhetorical role of a page chunk within the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkRole {
    Background,
    CoreIdea,
    Architecture,
    Mechanism,
    Results,
    Other,
}

impl ChunkRole {
    pub const ALL: [ChunkRole; 6] = [
        ChunkRole::Background,
        ChunkRole::CoreIdea,
        ChunkRole::Architecture,
        ChunkRole::Mechanism,
        ChunkRole::Results,
        ChunkRole::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChunkRole::Background => "BACKGROUND",
            ChunkRole::CoreIdea => "CORE_IDEA",
            ChunkRole::Architecture => "ARCHITECTURE",
            ChunkRole::Mechanism => "MECHANISM",
            ChunkRole::Results => "RESULTS",
            ChunkRole::Other => "OTHER",
        }
    }

    /// Parse an oracle answer. Total: the answer is trimmed and upper-cased,
    /// and anything that is not exactly one of the five substantive labels
    /// becomes [`ChunkRole::Other`].
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "BACKGROUND" => ChunkRole::Background,
            "CORE_IDEA" => ChunkRole::CoreIdea,
            "ARCHITECTURE" => ChunkRole::Architecture,
            "MECHANISM" => ChunkRole::Mechanism,
            "RESULTS" => ChunkRole::Results,
            _ => ChunkRole::Other,
        }
    }

    /// Roles whose chunks feed the technical text window.
    pub fn is_technical(self) -> bool {
        matches!(
            self,
            ChunkRole::CoreIdea | ChunkRole::Architecture | ChunkRole::Mechanism
        )
    }
}

impl fmt::Display for ChunkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub page: usize,
    pub role: ChunkRole,
    pub text: String,
}

/// Assigns a [`ChunkRole`] to each page chunk with one oracle call per chunk.
/// Never fails: oracle errors and unexpected answers both degrade to `OTHER`.
#[derive(Clone)]
pub struct ChunkRoleClassifier {
    oracle: Arc<dyn Oracle>,
}

impl ChunkRoleClassifier {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub fn prompt_for(text: &str) -> String {
        let labels = ChunkRole::ALL.map(ChunkRole::label).join("\n");
        format!(
            "
Classify the role of the following research paper text.

Possible labels:
{labels}

Rules:
- Return ONLY ONE label
- No explanation

Text:
{}
",
            truncate_chars(text, CLASSIFIER_INPUT_CHARS)
        )
    }

    /// The role the oracle assigns, or the oracle's error.
    pub async fn try_classify(&self, text: &str) -> Result<ChunkRole, OracleError> {
        let answer = self.oracle.complete(&Self::prompt_for(text)).await?;
        let role = ChunkRole::from_label(&answer);
        if role == ChunkRole::Other && answer.trim() != ChunkRole::Other.label() {
            debug!(answer = %answer.trim(), "Unrecognised role label, using OTHER");
        }
        Ok(role)
    }

    pub async fn classify(&self, text: &str) -> ChunkRole {
        self.try_classify(text).await.unwrap_or_else(|e| {
            warn!(error = %e, "Chunk classification failed, using OTHER");
            ChunkRole::Other
        })
    }

    /// Classify chunks sequentially, preserving their order. Failed calls
    /// still yield an `OTHER` chunk and are counted.
    pub async fn classify_chunks(&self, chunks: Vec<PageChunk>) -> ChunkClassification {
        let mut classification = ChunkClassification {
            chunks: Vec::with_capacity(chunks.len()),
            ..ChunkClassification::default()
        };
        for chunk in chunks {
            let role = match self.try_classify(&chunk.text).await {
                Ok(role) => role,
                Err(e) => {
                    warn!(page = chunk.page, error = %e, "Chunk classification failed, using OTHER");
                    classification.failed += 1;
                    classification.last_error = Some(e);
                    ChunkRole::Other
                }
            };
            debug!(page = chunk.page, %role, "Classified page chunk");
            classification.chunks.push(SemanticChunk {
                page: chunk.page,
                role,
                text: chunk.text,
            });
        }
        classification
    }
}

#[derive(Debug, Default)]
pub struct ChunkClassification {
    pub chunks: Vec<SemanticChunk>,
    /// How many chunks fell back to `OTHER` because the oracle call failed.
    pub failed: usize,
    pub last_error: Option<OracleError>,
}

impl ChunkClassification {
    /// True when there was something to classify and no call succeeded.
    pub fn all_failed(&self) -> bool {
        !self.chunks.is_empty() && self.failed == self.chunks.len()
    }
}
