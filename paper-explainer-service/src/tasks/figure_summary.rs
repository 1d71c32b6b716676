use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::{Figure, Oracle};
use tracing::{debug, info};

use super::{fail, load_analysis, save_analysis};

/// One collective paragraph for all figure captions, never one per figure.
pub struct FigureSummaryTask {
    oracle: Arc<dyn Oracle>,
}

impl FigureSummaryTask {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }
}

pub fn figure_summary_prompt(figures: &[Figure]) -> String {
    let captions = figures
        .iter()
        .map(|figure| figure.caption.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The following are figure captions from a research paper.

Task:
Write ONE short paragraph explaining what these diagrams collectively illustrate.

Rules:
- Do NOT explain figures individually
- Do NOT mention figure numbers
- Explain how these diagrams relate to the methodology
- Simple, clear academic English
- 8-10 points maximum and make sure to clearly talk about the displayed images only

Figure captions:
{captions}"
    )
}

#[async_trait]
impl Task for FigureSummaryTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let figures = analysis.figures.clone().unwrap_or_default();

        let summary = if figures.is_empty() {
            debug!(document_id = %analysis.id, "No captioned figures, skipping summary");
            String::new()
        } else {
            match self.oracle.complete(&figure_summary_prompt(&figures)).await {
                Ok(summary) => summary,
                Err(e) => return Err(fail(&context, self.id(), e.into()).await),
            }
        };

        info!(document_id = %analysis.id, figures = figures.len(), "Figure summary ready");
        analysis.figures_summary = Some(summary);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::End))
    }
}
