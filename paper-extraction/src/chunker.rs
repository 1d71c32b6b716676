use serde::{Deserialize, Serialize};

use crate::document::PageText;
use crate::normalize::normalize_text;

/// Pages whose normalized text is this short or shorter carry no signal.
pub const MIN_CHUNK_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageChunk {
    pub page: usize,
    pub text: String,
}

/// Normalize every page and keep those with more than [`MIN_CHUNK_CHARS`]
/// characters, in ascending page order. May return nothing.
pub fn chunk_pages(pages: &[PageText]) -> Vec<PageChunk> {
    let mut chunks: Vec<PageChunk> = pages
        .iter()
        .filter_map(|page| {
            let text = normalize_text(&page.text);
            (text.chars().count() > MIN_CHUNK_CHARS).then_some(PageChunk {
                page: page.index,
                text,
            })
        })
        .collect();
    chunks.sort_by_key(|chunk| chunk.page);
    chunks
}
