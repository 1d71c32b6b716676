use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use paper_extraction::{ExtractionError, OracleError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced to API callers.
///
/// Serializable so a workflow task can record the failure in the session
/// context and the handler can map it back to a status code.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum ExplainError {
    #[error("PDF not found")]
    DocumentNotFound(String),

    #[error("Only PDF files allowed")]
    InvalidUpload(String),

    #[error("Technical content not found")]
    TechnicalContentNotFound,

    #[error("PDF could not be read")]
    UnreadableDocument(String),

    #[error("Text generation service unavailable")]
    OracleUnavailable(String),

    #[error("Storage error")]
    Storage(String),

    #[error("Workflow execution failed")]
    Workflow(String),
}

impl ExplainError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExplainError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            ExplainError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ExplainError::UnreadableDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ExplainError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExplainError::TechnicalContentNotFound
            | ExplainError::Storage(_)
            | ExplainError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ExplainError::DocumentNotFound(details)
            | ExplainError::InvalidUpload(details)
            | ExplainError::UnreadableDocument(details)
            | ExplainError::OracleUnavailable(details)
            | ExplainError::Storage(details)
            | ExplainError::Workflow(details) => Some(details),
            ExplainError::TechnicalContentNotFound => None,
        }
    }
}

impl From<OracleError> for ExplainError {
    fn from(error: OracleError) -> Self {
        ExplainError::OracleUnavailable(error.to_string())
    }
}

impl From<ExtractionError> for ExplainError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::Pdf(message) => ExplainError::UnreadableDocument(message),
            ExtractionError::Io(e) => ExplainError::Storage(e.to_string()),
            other => ExplainError::Workflow(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ExplainError {
    fn from(error: std::io::Error) -> Self {
        ExplainError::Storage(error.to_string())
    }
}

impl IntoResponse for ExplainError {
    fn into_response(self) -> Response {
        let body = match self.details() {
            Some(details) => json!({ "error": self.to_string(), "details": details }),
            None => json!({ "error": self.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}
