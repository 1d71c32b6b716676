use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::{DocumentLoader, Figure, FigureExtractor};
use tracing::info;

use super::{fail, load_analysis, save_analysis};
use crate::error::ExplainError;

/// Writes every embedded image to the figure directory and keeps the
/// captioned ones. Images are not carried in the context, so the PDF is
/// opened again here.
pub struct FigureExtractionTask {
    loader: Arc<dyn DocumentLoader>,
    extractor: FigureExtractor,
}

impl FigureExtractionTask {
    pub fn new(loader: Arc<dyn DocumentLoader>, extractor: FigureExtractor) -> Self {
        Self { loader, extractor }
    }
}

#[async_trait]
impl Task for FigureExtractionTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;

        let loader = self.loader.clone();
        let extractor = self.extractor.clone();
        let path = PathBuf::from(&analysis.pdf_path);
        let document_id = analysis.id.clone();

        let extracted = tokio::task::spawn_blocking(move || -> std::result::Result<Vec<Figure>, ExplainError> {
            let document = loader.load(&path)?;
            Ok(extractor.extract(&document_id, &document.pages)?)
        })
        .await
        .map_err(|e| ExplainError::Workflow(format!("figure extraction panicked: {e}")))
        .and_then(|inner| inner);

        let figures = match extracted {
            Ok(figures) => figures,
            Err(failure) => return Err(fail(&context, self.id(), failure).await),
        };

        info!(document_id = %analysis.id, figures = figures.len(), "Captioned figures kept");
        analysis.figures = Some(figures);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}
