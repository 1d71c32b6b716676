use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::{DocumentLoader, PaperDocument};
use tracing::info;

use super::{fail, load_analysis, save_analysis};
use crate::error::ExplainError;

/// Reads the stored PDF and puts its normalized text and page texts into the
/// analysis.
pub struct LoadDocumentTask {
    loader: Arc<dyn DocumentLoader>,
}

impl LoadDocumentTask {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Task for LoadDocumentTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        info!(document_id = %analysis.id, path = %analysis.pdf_path, "Loading PDF");

        let document = match load_blocking(self.loader.clone(), PathBuf::from(&analysis.pdf_path)).await {
            Ok(document) => document,
            Err(failure) => return Err(fail(&context, self.id(), failure).await),
        };

        let full_text = document.full_text();
        info!(
            document_id = %analysis.id,
            pages = document.pages.len(),
            images = document.image_count(),
            chars = full_text.chars().count(),
            "PDF loaded"
        );

        analysis.pages = Some(document.page_texts());
        analysis.full_text = Some(full_text);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}

/// PDF parsing is CPU and disk bound; keep it off the async workers.
pub(crate) async fn load_blocking(
    loader: Arc<dyn DocumentLoader>,
    path: PathBuf,
) -> std::result::Result<PaperDocument, ExplainError> {
    tokio::task::spawn_blocking(move || loader.load(&path))
        .await
        .map_err(|e| ExplainError::Workflow(format!("PDF loading task panicked: {e}")))?
        .map_err(ExplainError::from)
}
