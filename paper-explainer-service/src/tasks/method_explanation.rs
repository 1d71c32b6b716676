use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::Oracle;
use tracing::info;

use super::{fail, load_analysis, required, save_analysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationDepth {
    /// Intermediate tier: plain language, no equations.
    Conceptual,
    /// Advanced tier: one paragraph per component, academic tone.
    InDepth,
}

impl ExplanationDepth {
    pub fn prompt(self, methodology: &str) -> String {
        match self {
            ExplanationDepth::Conceptual => format!(
                "Explain the methodology conceptually.

Rules:
- Simple English but keep technical meaning
- No equations

Methodology:
{methodology}"
            ),
            ExplanationDepth::InDepth => format!(
                "Explain the methodology in technical depth.

Rules:
- Write in multiple paragraphs
- Each paragraph should cover one logical component
- No bullet points
- Academic tone

Methodology:
{methodology}"
            ),
        }
    }
}

pub struct MethodExplanationTask {
    oracle: Arc<dyn Oracle>,
    depth: ExplanationDepth,
}

impl MethodExplanationTask {
    pub fn new(oracle: Arc<dyn Oracle>, depth: ExplanationDepth) -> Self {
        Self { oracle, depth }
    }
}

#[async_trait]
impl Task for MethodExplanationTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let technical = required(analysis.technical_text.as_ref(), "technical text")?;

        let prompt = self.depth.prompt(&technical.text);
        let explanation = match self.oracle.complete(&prompt).await {
            Ok(explanation) => explanation,
            Err(e) => return Err(fail(&context, self.id(), e.into()).await),
        };

        info!(
            document_id = %analysis.id,
            depth = ?self.depth,
            chars = explanation.len(),
            "Methodology explained"
        );
        analysis.method_explanation = Some(explanation);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}
