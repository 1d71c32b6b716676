// Explanation workflow tasks
pub mod easy_overview;
pub mod equation_explanation;
pub mod figure_extraction;
pub mod figure_summary;
pub mod load_document;
pub mod method_explanation;
pub mod results_explanation;
pub mod technical_text;

pub use easy_overview::EasyOverviewTask;
pub use equation_explanation::EquationExplanationTask;
pub use figure_extraction::FigureExtractionTask;
pub use figure_summary::FigureSummaryTask;
pub use load_document::LoadDocumentTask;
pub use method_explanation::{ExplanationDepth, MethodExplanationTask};
pub use results_explanation::ResultsExplanationTask;
pub use technical_text::TechnicalTextTask;

use graph_flow::{Context, GraphError};
use tracing::error;

use crate::error::ExplainError;
use crate::models::PaperAnalysis;

pub mod session_keys {
    pub const ANALYSIS: &str = "analysis";
    /// Set by a task right before it returns an error.
    pub const FAILURE: &str = "failure";
}

pub(crate) async fn load_analysis(context: &Context) -> graph_flow::Result<PaperAnalysis> {
    context
        .get(session_keys::ANALYSIS)
        .await
        .ok_or_else(|| GraphError::ContextError("analysis not found in context".to_string()))
}

pub(crate) async fn save_analysis(context: &Context, analysis: PaperAnalysis) {
    context.set(session_keys::ANALYSIS, analysis).await;
}

/// Record the failure for the request handler and turn it into a task error.
pub(crate) async fn fail(context: &Context, task: &str, failure: ExplainError) -> GraphError {
    error!(task, error = %failure, details = ?failure.details(), "Task failed");
    let message = failure.to_string();
    context.set(session_keys::FAILURE, failure).await;
    GraphError::TaskExecutionFailed(message)
}

/// Text a task depends on from an earlier step.
pub(crate) fn required<T>(value: Option<T>, what: &str) -> graph_flow::Result<T> {
    value.ok_or_else(|| GraphError::ContextError(format!("{what} missing from analysis")))
}
