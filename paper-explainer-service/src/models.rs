use paper_extraction::{Figure, PageText, TechnicalText};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationLevel {
    Easy,
    Intermediate,
    Advanced,
}

impl ExplanationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ExplanationLevel::Easy => "easy",
            ExplanationLevel::Intermediate => "intermediate",
            ExplanationLevel::Advanced => "advanced",
        }
    }
}

/// Working state of one explanation request, carried in the session context
/// and filled in task by task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperAnalysis {
    pub id: String,
    pub pdf_path: String,
    pub level: ExplanationLevel,
    pub full_text: Option<String>,
    pub pages: Option<Vec<PageText>>,
    pub technical_text: Option<TechnicalText>,
    pub figures: Option<Vec<Figure>>,
    pub figures_summary: Option<String>,
    pub method_explanation: Option<String>,
    pub equations: Option<Vec<String>>,
    pub equation_explanations: Option<Vec<String>>,
    pub results_explanation: Option<String>,
    pub overview: Option<String>,
}

impl PaperAnalysis {
    pub fn new(id: impl Into<String>, pdf_path: impl Into<String>, level: ExplanationLevel) -> Self {
        Self {
            id: id.into(),
            pdf_path: pdf_path.into(),
            level,
            full_text: None,
            pages: None,
            technical_text: None,
            figures: None,
            figures_summary: None,
            method_explanation: None,
            equations: None,
            equation_explanations: None,
            results_explanation: None,
            overview: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EasyExplanation {
    pub level: ExplanationLevel,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateExplanation {
    pub level: ExplanationLevel,
    pub method_explanation: String,
    pub figures: Vec<Figure>,
    /// Empty when the paper has no captioned figures.
    pub figures_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedExplanation {
    pub level: ExplanationLevel,
    pub methodology_text: String,
    /// Oracle response split on blank lines; not aligned one-to-one with
    /// `equations`.
    pub equation_explanations: Vec<String>,
    pub equations: Vec<String>,
    pub results_explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Explanation {
    Easy(EasyExplanation),
    Intermediate(IntermediateExplanation),
    Advanced(AdvancedExplanation),
}
