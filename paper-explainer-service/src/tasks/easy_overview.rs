use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use paper_extraction::locator::KEYWORD_WINDOW;
use paper_extraction::{Oracle, SectionLocator};
use tracing::{debug, info};

use super::{fail, load_analysis, required, save_analysis};

const ANCHORS: [&str; 3] = ["abstract", "introduction", "conclusion"];

/// Beginner-level bullet summary built from the abstract, introduction and
/// conclusion windows.
pub struct EasyOverviewTask {
    oracle: Arc<dyn Oracle>,
    anchors: Vec<SectionLocator>,
}

impl EasyOverviewTask {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            anchors: ANCHORS
                .iter()
                .map(|keyword| SectionLocator::keyword(keyword, KEYWORD_WINDOW))
                .collect(),
        }
    }

    fn overview_sections(&self, full_text: &str) -> String {
        let windows: Vec<String> = self
            .anchors
            .iter()
            .map(|locator| locator.locate_text(full_text))
            .collect();
        debug!(
            abstract_chars = windows[0].len(),
            introduction_chars = windows[1].len(),
            conclusion_chars = windows[2].len(),
            "Overview windows located"
        );
        format!(
            "\nABSTRACT:\n{}\n\nINTRODUCTION:\n{}\n\nCONCLUSION:\n{}\n",
            windows[0], windows[1], windows[2]
        )
    }
}

pub fn overview_prompt(sections: &str) -> String {
    format!(
        "Explain this research paper for a beginner.

Rules:
- Bullet points
- Simple English
- No equations
- Max 8 points

Paper:
{sections}"
    )
}

#[async_trait]
impl Task for EasyOverviewTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut analysis = load_analysis(&context).await?;
        let full_text = required(analysis.full_text.as_deref(), "full text")?;

        let prompt = overview_prompt(&self.overview_sections(full_text));
        let overview = match self.oracle.complete(&prompt).await {
            Ok(overview) => overview,
            Err(e) => return Err(fail(&context, self.id(), e.into()).await),
        };

        info!(document_id = %analysis.id, chars = overview.len(), "Easy overview generated");
        analysis.overview = Some(overview);
        save_analysis(&context, analysis).await;

        Ok(TaskResult::new(None, NextAction::End))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplainError;
    use crate::models::{ExplanationLevel, PaperAnalysis};
    use crate::tasks::session_keys;
    use crate::tasks::test_support::ScriptedOracle;

    async fn context_with_text(text: &str) -> Context {
        let context = Context::new();
        let mut analysis = PaperAnalysis::new("doc", "doc.pdf", ExplanationLevel::Easy);
        analysis.full_text = Some(text.to_string());
        context.set(session_keys::ANALYSIS, analysis).await;
        context
    }

    #[tokio::test]
    async fn prompt_carries_the_anchor_windows() {
        let oracle = Arc::new(ScriptedOracle::replying(&["- point one"]));
        let context = context_with_text(
            "Title\nAbstract: we study graphs.\n1 Introduction\nGraphs matter.\n5 Conclusion\nThey do.",
        )
        .await;

        let result = EasyOverviewTask::new(oracle.clone()).run(context.clone()).await.unwrap();

        assert!(matches!(result.next_action, NextAction::End));
        let prompt = oracle.last_prompt();
        assert!(prompt.starts_with("Explain this research paper for a beginner."));
        assert!(prompt.contains("ABSTRACT:\nAbstract: we study graphs."));
        assert!(prompt.contains("CONCLUSION:\nConclusion\nThey do."));
        let analysis = load_analysis(&context).await.unwrap();
        assert_eq!(analysis.overview.as_deref(), Some("- point one"));
    }

    #[tokio::test]
    async fn missing_anchors_leave_empty_sections() {
        let oracle = Arc::new(ScriptedOracle::replying(&["ok"]));
        let context = context_with_text("nothing to anchor on").await;

        EasyOverviewTask::new(oracle.clone()).run(context).await.unwrap();

        assert!(oracle.last_prompt().contains("ABSTRACT:\n\n\nINTRODUCTION:\n\n\nCONCLUSION:\n\n"));
    }

    #[tokio::test]
    async fn oracle_failure_is_recorded() {
        let oracle = Arc::new(ScriptedOracle::failing());
        let context = context_with_text("Abstract text").await;

        assert!(EasyOverviewTask::new(oracle).run(context.clone()).await.is_err());

        let failure: ExplainError = context.get(session_keys::FAILURE).await.unwrap();
        assert!(matches!(failure, ExplainError::OracleUnavailable(_)));
    }
}
