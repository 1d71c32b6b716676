use std::any::type_name;
use std::path::Path;
use std::sync::Arc;

use graph_flow::{ExecutionStatus, Graph, GraphBuilder, Session, Task};
use paper_extraction::{
    ChunkRoleClassifier, DocumentLoader, FigureExtractor, FigureStore, Oracle,
    TechnicalTextExtractor,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::ExplainError;
use crate::models::{
    AdvancedExplanation, EasyExplanation, Explanation, ExplanationLevel, IntermediateExplanation,
    PaperAnalysis,
};
use crate::tasks::*;

/// Collaborators injected into every workflow task.
#[derive(Clone)]
pub struct ExplainerDeps {
    pub oracle: Arc<dyn Oracle>,
    pub loader: Arc<dyn DocumentLoader>,
    pub figure_store: FigureStore,
}

/// Load → overview.
pub fn build_easy_workflow(deps: &ExplainerDeps) -> Graph {
    let load_task = Arc::new(LoadDocumentTask::new(deps.loader.clone()));
    let load_id = load_task.id().to_string();

    let overview_task = Arc::new(EasyOverviewTask::new(deps.oracle.clone()));
    let overview_id = overview_task.id().to_string();

    GraphBuilder::new("easy_explanation")
        .add_task(load_task)
        .add_task(overview_task)
        .add_edge(&load_id, &overview_id)
        .build()
}

/// Load → technical text → conceptual methodology → figures → figure summary.
pub fn build_intermediate_workflow(deps: &ExplainerDeps) -> Graph {
    let load_task = Arc::new(LoadDocumentTask::new(deps.loader.clone()));
    let load_id = load_task.id().to_string();

    let technical_task = Arc::new(technical_text_task(deps));
    let technical_id = technical_task.id().to_string();

    let method_task = Arc::new(MethodExplanationTask::new(
        deps.oracle.clone(),
        ExplanationDepth::Conceptual,
    ));
    let method_id = method_task.id().to_string();

    let figures_task = Arc::new(FigureExtractionTask::new(
        deps.loader.clone(),
        FigureExtractor::new(deps.figure_store.clone()),
    ));
    let figures_id = figures_task.id().to_string();

    let summary_task = Arc::new(FigureSummaryTask::new(deps.oracle.clone()));
    let summary_id = summary_task.id().to_string();

    GraphBuilder::new("intermediate_explanation")
        .add_task(load_task)
        .add_task(technical_task)
        .add_task(method_task)
        .add_task(figures_task)
        .add_task(summary_task)
        .add_edge(&load_id, &technical_id)
        .add_edge(&technical_id, &method_id)
        .add_edge(&method_id, &figures_id)
        .add_edge(&figures_id, &summary_id)
        .build()
}

/// Load → technical text → in-depth methodology → equations → results.
pub fn build_advanced_workflow(deps: &ExplainerDeps) -> Graph {
    let load_task = Arc::new(LoadDocumentTask::new(deps.loader.clone()));
    let load_id = load_task.id().to_string();

    let technical_task = Arc::new(technical_text_task(deps));
    let technical_id = technical_task.id().to_string();

    let method_task = Arc::new(MethodExplanationTask::new(
        deps.oracle.clone(),
        ExplanationDepth::InDepth,
    ));
    let method_id = method_task.id().to_string();

    let equations_task = Arc::new(EquationExplanationTask::new(deps.oracle.clone()));
    let equations_id = equations_task.id().to_string();

    let results_task = Arc::new(ResultsExplanationTask::new(deps.oracle.clone()));
    let results_id = results_task.id().to_string();

    GraphBuilder::new("advanced_explanation")
        .add_task(load_task)
        .add_task(technical_task)
        .add_task(method_task)
        .add_task(equations_task)
        .add_task(results_task)
        .add_edge(&load_id, &technical_id)
        .add_edge(&technical_id, &method_id)
        .add_edge(&method_id, &equations_id)
        .add_edge(&equations_id, &results_id)
        .build()
}

fn technical_text_task(deps: &ExplainerDeps) -> TechnicalTextTask {
    TechnicalTextTask::new(TechnicalTextExtractor::new(ChunkRoleClassifier::new(
        deps.oracle.clone(),
    )))
}

/// The three tier graphs, built once and shared by all requests.
#[derive(Clone)]
pub struct TierGraphs {
    easy: Arc<Graph>,
    intermediate: Arc<Graph>,
    advanced: Arc<Graph>,
}

impl TierGraphs {
    pub fn build(deps: &ExplainerDeps) -> Self {
        Self {
            easy: Arc::new(build_easy_workflow(deps)),
            intermediate: Arc::new(build_intermediate_workflow(deps)),
            advanced: Arc::new(build_advanced_workflow(deps)),
        }
    }

    pub fn for_level(&self, level: ExplanationLevel) -> Arc<Graph> {
        match level {
            ExplanationLevel::Easy => self.easy.clone(),
            ExplanationLevel::Intermediate => self.intermediate.clone(),
            ExplanationLevel::Advanced => self.advanced.clone(),
        }
    }
}

/// Fresh session positioned at the load task. Sessions are never reused
/// between requests.
pub async fn create_explanation_session(
    level: ExplanationLevel,
    file_id: &str,
    pdf_path: &Path,
) -> Session {
    let analysis = PaperAnalysis::new(file_id, pdf_path.to_string_lossy(), level);

    let session_id = Uuid::new_v4().to_string();
    let session = Session::new_from_task(session_id, type_name::<LoadDocumentTask>());
    session.context.set(session_keys::ANALYSIS, analysis).await;

    session
}

/// Run one tier over a stored PDF and assemble its response.
pub async fn explain_document(
    graphs: &TierGraphs,
    level: ExplanationLevel,
    file_id: &str,
    pdf_path: &Path,
) -> Result<Explanation, ExplainError> {
    let graph = graphs.for_level(level);
    let mut session = create_explanation_session(level, file_id, pdf_path).await;
    info!(session_id = %session.id, file_id, level = level.as_str(), "Starting explanation workflow");

    let outcome = graph.execute_session(&mut session).await;

    // A task that failed on purpose left the reason behind.
    if let Some(failure) = session.context.get::<ExplainError>(session_keys::FAILURE).await {
        return Err(failure);
    }

    match outcome {
        Ok(result) => match result.status {
            ExecutionStatus::Completed => {}
            other => {
                error!(session_id = %session.id, status = ?other, "Workflow stopped before completion");
                return Err(ExplainError::Workflow(format!(
                    "workflow stopped early: {other:?}"
                )));
            }
        },
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Workflow execution failed");
            return Err(ExplainError::Workflow(e.to_string()));
        }
    }

    let analysis: PaperAnalysis = session
        .context
        .get(session_keys::ANALYSIS)
        .await
        .ok_or_else(|| ExplainError::Workflow("analysis missing after workflow".to_string()))?;

    info!(session_id = %session.id, file_id, level = level.as_str(), "Explanation workflow completed");
    assemble(analysis)
}

fn assemble(analysis: PaperAnalysis) -> Result<Explanation, ExplainError> {
    let missing = |what: &str| ExplainError::Workflow(format!("{what} missing after workflow"));

    let explanation = match analysis.level {
        ExplanationLevel::Easy => Explanation::Easy(EasyExplanation {
            level: analysis.level,
            explanation: analysis.overview.ok_or_else(|| missing("overview"))?,
        }),
        ExplanationLevel::Intermediate => Explanation::Intermediate(IntermediateExplanation {
            level: analysis.level,
            method_explanation: analysis
                .method_explanation
                .ok_or_else(|| missing("method explanation"))?,
            figures: analysis.figures.unwrap_or_default(),
            figures_summary: analysis.figures_summary.unwrap_or_default(),
        }),
        ExplanationLevel::Advanced => Explanation::Advanced(AdvancedExplanation {
            level: analysis.level,
            methodology_text: analysis
                .method_explanation
                .ok_or_else(|| missing("method explanation"))?,
            equation_explanations: analysis.equation_explanations.unwrap_or_default(),
            equations: analysis.equations.unwrap_or_default(),
            results_explanation: analysis
                .results_explanation
                .ok_or_else(|| missing("results explanation"))?,
        }),
    };
    Ok(explanation)
}
