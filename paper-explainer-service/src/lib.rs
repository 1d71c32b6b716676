pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;
pub mod tasks;
pub mod telemetry;
pub mod workflow;

pub use config::{AppConfig, ConfigError};
pub use error::ExplainError;
pub use models::*;
pub use service::{AppState, build_router, create_app};
pub use workflow::{
    ExplainerDeps, TierGraphs, build_advanced_workflow, build_easy_workflow,
    build_intermediate_workflow, create_explanation_session, explain_document,
};
