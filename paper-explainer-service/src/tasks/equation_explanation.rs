use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::{Oracle, extract_equations};
use tracing::{debug, info};

use super::{fail, load_analysis, required, save_analysis};

/// Explains the equation candidates found in the technical text.
///
/// The response is split on blank lines. Nothing makes the oracle emit one
/// paragraph per equation, so the pieces do not line up with the equations.
pub struct EquationExplanationTask {
    oracle: Arc<dyn Oracle>,
}

impl EquationExplanationTask {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }
}

pub fn equation_prompt(context_text: &str, equations: &[String]) -> String {
    format!(
        "Explain the following equations.

Rules:
- Explain variables
- Explain purpose
- If unclear, say so

Context:
{context_text}

Equations:
{}",
        equations.join("\n")
    )
}

pub fn split_paragraphs(response: &str) -> Vec<String> {
    response
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Task for EquationExplanationTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let technical = required(analysis.technical_text.as_ref(), "technical text")?;

        let equations = extract_equations(&technical.text);
        let explanations = if equations.is_empty() {
            debug!(document_id = %analysis.id, "No equation candidates");
            Vec::new()
        } else {
            let prompt = equation_prompt(&technical.text, &equations);
            match self.oracle.complete(&prompt).await {
                Ok(response) => split_paragraphs(&response),
                Err(e) => return Err(fail(&context, self.id(), e.into()).await),
            }
        };

        info!(
            document_id = %analysis.id,
            equations = equations.len(),
            paragraphs = explanations.len(),
            "Equations explained"
        );
        analysis.equations = Some(equations);
        analysis.equation_explanations = Some(explanations);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
    }
}
