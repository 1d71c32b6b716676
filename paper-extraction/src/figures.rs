//! Figure extraction: embedded images paired with a caption line.
//!
//! Every embedded image is written to the figure directory. It is only
//! reported as a [`Figure`] when its page has a caption-like line
//! ("Fig. 3", "fig 2", ...) and that caption has not been reported before
//! for the same document. Images without a caption are treated as
//! decorative, and distinct images sharing a caption collapse to one entry.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Page;
use crate::error::Result;

static CAPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfig\.?\s*\d+").expect("caption pattern compiles"));

static FIGURE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)fig\.?\s*(\d+)").expect("figure number pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    pub image_url: String,
    pub caption: String,
}

/// The first line of a page that looks like a figure caption, trimmed.
pub fn caption_for_page(page_text: &str) -> Option<String> {
    page_text
        .lines()
        .find(|line| CAPTION_LINE.is_match(line))
        .map(|line| line.trim().to_string())
}

/// The number in a caption such as "Fig. 2: System diagram".
pub fn figure_number(caption: &str) -> Option<u32> {
    FIGURE_NUMBER
        .captures(caption)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse().ok())
}

/// Flat directory of figure images, exposed under a URL prefix.
#[derive(Debug, Clone)]
pub struct FigureStore {
    dir: PathBuf,
    url_prefix: String,
}

impl FigureStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Namespaced by document so two uploads never overwrite each other.
    pub fn file_name(document_id: &str, page: usize, image: usize) -> String {
        format!("{document_id}_fig_p{page}_{image}.png")
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.url_prefix)
    }

    pub fn persist(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

#[derive(Debug, Clone)]
pub struct FigureExtractor {
    store: FigureStore,
}

impl FigureExtractor {
    pub fn new(store: FigureStore) -> Self {
        Self { store }
    }

    /// Blocking: writes image files.
    pub fn extract(&self, document_id: &str, pages: &[Page]) -> Result<Vec<Figure>> {
        let mut figures = Vec::new();
        let mut seen = HashSet::new();

        for page in pages {
            if page.images.is_empty() {
                continue;
            }
            let caption = caption_for_page(&page.text);

            for image in &page.images {
                let file_name = FigureStore::file_name(document_id, page.index, image.index);
                self.store.persist(&file_name, &image.data)?;

                let Some(caption) = caption.as_ref().filter(|c| !c.is_empty()) else {
                    debug!(page = page.index, image = image.index, "Image has no caption, skipping");
                    continue;
                };
                if !seen.insert(caption.clone()) {
                    debug!(page = page.index, image = image.index, %caption, "Duplicate caption, skipping");
                    continue;
                }

                figures.push(Figure {
                    image_url: self.store.url_for(&file_name),
                    caption: caption.clone(),
                });
            }
        }

        info!(document_id, figures = figures.len(), "Figures extracted");
        Ok(figures)
    }
}
