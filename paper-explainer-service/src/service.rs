use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, Method},
    middleware::from_fn,
    response::Json,
    routing::{get, post},
};
use paper_extraction::{FigureStore, HttpOracle, LopdfLoader};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::ExplainError,
    models::{Explanation, ExplanationLevel, UploadResponse},
    storage::UploadStore,
    telemetry::correlation_id_middleware,
    workflow::{ExplainerDeps, TierGraphs, explain_document},
};

type ApiResult<T> = Result<Json<T>, ExplainError>;

#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadStore,
    pub graphs: TierGraphs,
}

impl AppState {
    pub fn new(config: &AppConfig, deps: &ExplainerDeps) -> Self {
        Self {
            uploads: UploadStore::new(&config.upload_dir),
            graphs: TierGraphs::build(deps),
        }
    }
}

/// Production wiring: HTTP oracle, lopdf loader, directories from config.
pub fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let oracle = HttpOracle::new(config.oracle.clone())?;
    let deps = ExplainerDeps {
        oracle: Arc::new(oracle),
        loader: Arc::new(LopdfLoader),
        figure_store: FigureStore::new(&config.figure_dir, &config.figure_url_prefix),
    };

    std::fs::create_dir_all(&config.upload_dir)?;
    std::fs::create_dir_all(&config.figure_dir)?;

    Ok(build_router(AppState::new(config, &deps), config))
}

pub fn build_router(app_state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/upload", post(upload_pdf))
        .route("/explain/easy_llm/{file_id}", post(explain_easy))
        .route("/explain/intermediate/{file_id}", post(explain_intermediate))
        .route("/explain/advanced/{file_id}", post(explain_advanced))
        .nest_service(&config.figure_url_prefix, ServeDir::new(&config.figure_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(config.cors_allowed_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = allowed_origin else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
        Err(_) => {
            warn!(origin, "Invalid CORS origin, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "backend running",
        "service": "Paper Explainer Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /upload": "Upload a PDF (multipart field 'file')",
            "POST /explain/easy_llm/{file_id}": "Beginner bullet-point overview",
            "POST /explain/intermediate/{file_id}": "Conceptual methodology with figures",
            "POST /explain/advanced/{file_id}": "In-depth methodology, equations and results",
            "GET /figures/{filename}": "Extracted figure images",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ExplainError::InvalidUpload(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        UploadStore::validate_pdf_filename(&filename)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ExplainError::InvalidUpload(e.body_text()))?;
        let file_id = state.uploads.save_pdf(&data).await?;

        info!(%file_id, %filename, bytes = data.len(), "Upload accepted");
        return Ok(Json(UploadResponse { file_id }));
    }

    Err(ExplainError::InvalidUpload(
        "multipart field 'file' is required".to_string(),
    ))
}

async fn explain_easy(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Explanation> {
    explain(&state, ExplanationLevel::Easy, &file_id).await
}

async fn explain_intermediate(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Explanation> {
    explain(&state, ExplanationLevel::Intermediate, &file_id).await
}

async fn explain_advanced(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Explanation> {
    explain(&state, ExplanationLevel::Advanced, &file_id).await
}

async fn explain(state: &AppState, level: ExplanationLevel, file_id: &str) -> ApiResult<Explanation> {
    info!(file_id, level = level.as_str(), "Explanation requested");

    let pdf_path = state.uploads.resolve(file_id).await?;
    let explanation = explain_document(&state.graphs, level, file_id, &pdf_path).await?;

    Ok(Json(explanation))
}
