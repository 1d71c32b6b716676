use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::{Oracle, SectionLocator};
use tracing::{info, warn};

use super::{fail, load_analysis, required, save_analysis};

/// Stands in for the results window when no anchor matched.
pub const NO_RESULTS_PLACEHOLDER: &str = "No results section found.";

pub struct ResultsExplanationTask {
    oracle: Arc<dyn Oracle>,
    locator: SectionLocator,
}

impl ResultsExplanationTask {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            locator: SectionLocator::results(),
        }
    }
}

pub fn results_prompt(results: &str) -> String {
    format!(
        "Explain the results.

Rules:
- Explain metrics
- Interpret values
- Mention conclusions

Results:
{results}"
    )
}

#[async_trait]
impl Task for ResultsExplanationTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let full_text = required(analysis.full_text.as_deref(), "full text")?;

        let results = match self.locator.locate(full_text) {
            Some(section) => section.text,
            None => {
                warn!(document_id = %analysis.id, "No results section found");
                NO_RESULTS_PLACEHOLDER.to_string()
            }
        };

        let explanation = match self.oracle.complete(&results_prompt(&results)).await {
            Ok(explanation) => explanation,
            Err(e) => return Err(fail(&context, self.id(), e.into()).await),
        };

        info!(document_id = %analysis.id, chars = explanation.len(), "Results explained");
        analysis.results_explanation = Some(explanation);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::End))
    }
}
