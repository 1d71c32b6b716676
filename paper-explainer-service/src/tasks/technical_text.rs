use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::TechnicalTextExtractor;
use tracing::info;

use super::{fail, load_analysis, required, save_analysis};
use crate::error::ExplainError;

/// Selects the technical text window: heading cascade first, role
/// classification as the fallback. Fails the request when neither finds
/// anything, or as unavailable when the oracle answered no classification.
pub struct TechnicalTextTask {
    extractor: TechnicalTextExtractor,
}

impl TechnicalTextTask {
    pub fn new(extractor: TechnicalTextExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Task for TechnicalTextTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let full_text = required(analysis.full_text.as_deref(), "full text")?;
        let pages = analysis.pages.as_deref().unwrap_or_default();

        let technical = match self.extractor.extract(full_text, pages).await {
            Ok(Some(technical)) => technical,
            Ok(None) => {
                return Err(fail(&context, self.id(), ExplainError::TechnicalContentNotFound).await);
            }
            Err(e) => return Err(fail(&context, self.id(), e.into()).await),
        };

        info!(
            document_id = %analysis.id,
            source = ?technical.source,
            chars = technical.text.chars().count(),
            "Technical text selected"
        );
        analysis.technical_text = Some(technical);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}
