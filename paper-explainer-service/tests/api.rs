use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use paper_explainer_service::{AppConfig, AppState, ExplainerDeps, build_router};
use paper_extraction::{
    DocumentLoader, EmbeddedImage, ExtractionError, FigureStore, Oracle, OracleError, Page,
    PaperDocument,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Answers classification prompts with a fixed role and everything else
/// with a canned explanation.
struct StubOracle {
    role: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl StubOracle {
    fn labelling(role: &'static str) -> Self {
        Self {
            role,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn unavailable() -> Self {
        Self {
            role: "OTHER",
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OracleError::Timeout(std::time::Duration::from_secs(60)));
        }
        if prompt.contains("Classify the role") {
            Ok(self.role.to_string())
        } else if prompt.contains("figure captions") {
            Ok("The diagrams show the pipeline end to end.".to_string())
        } else {
            Ok("A clear explanation.".to_string())
        }
    }
}

/// Ignores the uploaded bytes and hands back fixed pages.
struct StubLoader {
    pages: Option<Vec<Page>>,
}

impl DocumentLoader for StubLoader {
    fn load(&self, path: &Path) -> paper_extraction::Result<PaperDocument> {
        match &self.pages {
            Some(pages) => Ok(PaperDocument::new(pages.clone())),
            None => Err(ExtractionError::Pdf(format!("{} is not a PDF", path.display()))),
        }
    }
}

fn text_page(index: usize, text: impl Into<String>) -> Page {
    Page {
        index,
        text: text.into(),
        images: Vec::new(),
    }
}

fn methodology_paper() -> Vec<Page> {
    let body = "The encoder maps each token to a vector. ".repeat(120);
    vec![
        text_page(0, "Abstract\nWe study sequence encoders."),
        text_page(1, "1 Introduction\nSequence models are everywhere."),
        text_page(2, "2 Related Work\nPrior work is summarised here."),
        Page {
            index: 3,
            text: format!("3. Proposed Methodology\n{body}\nFig. 2: System diagram"),
            images: vec![EmbeddedImage {
                index: 0,
                data: vec![0x89, b'P', b'N', b'G'],
            }],
        },
    ]
}

fn headingless_paper() -> Vec<Page> {
    (0..3)
        .map(|index| text_page(index, "Long ago people wrote letters by hand. ".repeat(10)))
        .collect()
}

struct TestApp {
    router: Router,
    oracle: Arc<StubOracle>,
    _dir: TempDir,
}

fn test_app(oracle: StubOracle, pages: Option<Vec<Page>>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        upload_dir: dir.path().join("uploads"),
        figure_dir: dir.path().join("figures"),
        ..AppConfig::default()
    };
    let oracle = Arc::new(oracle);
    let deps = ExplainerDeps {
        oracle: oracle.clone(),
        loader: Arc::new(StubLoader { pages }),
        figure_store: FigureStore::new(&config.figure_dir, &config.figure_url_prefix),
    };

    TestApp {
        router: build_router(AppState::new(&config, &deps), &config),
        oracle,
        _dir: dir,
    }
}

fn upload_request(filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "paper-explainer-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn upload(app: &TestApp) -> String {
    let response = app
        .router
        .clone()
        .oneshot(upload_request("paper.pdf", b"%PDF-1.5 stub"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["file_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_status() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(Vec::new()));

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn non_pdf_upload_is_rejected() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(Vec::new()));

    let response = app
        .router
        .clone()
        .oneshot(upload_request("notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Only PDF files allowed");
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(Vec::new()));

    for uri in [
        "/explain/easy_llm/6f1c2b43-9a43-4d4e-8d59-0d1d1f1c0a11",
        "/explain/advanced/not-a-uuid",
    ] {
        let response = app.router.clone().oneshot(post(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "PDF not found");
    }
    assert_eq!(app.oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn intermediate_tier_end_to_end() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(methodology_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/intermediate/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["level"], "intermediate");
    assert!(!body["method_explanation"].as_str().unwrap().is_empty());
    let figures = body["figures"].as_array().unwrap();
    assert_eq!(figures.len(), 1);
    assert!(figures[0]["caption"].as_str().unwrap().contains("Fig. 2"));
    assert_eq!(
        figures[0]["image_url"],
        format!("/figures/{file_id}_fig_p3_0.png")
    );
    assert!(!body["figures_summary"].as_str().unwrap().is_empty());
    // Heading found: methodology and figure summary only, no classification.
    assert_eq!(app.oracle.calls.load(Ordering::SeqCst), 2);

    let image_url = figures[0]["image_url"].as_str().unwrap().to_string();
    let response = app
        .router
        .clone()
        .oneshot(Request::get(image_url.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn advanced_tier_without_technical_content_fails() {
    let app = test_app(StubOracle::labelling("BACKGROUND"), Some(headingless_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/advanced/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Technical content not found");
    // One classification call per page chunk, nothing else.
    assert_eq!(app.oracle.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn oracle_outage_during_classification_is_service_unavailable() {
    let app = test_app(StubOracle::unavailable(), Some(headingless_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/advanced/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await["error"],
        "Text generation service unavailable"
    );
    assert_eq!(app.oracle.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn advanced_tier_end_to_end() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(methodology_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/advanced/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["level"], "advanced");
    assert_eq!(body["methodology_text"], "A clear explanation.");
    // The methodology body has no `=` lines.
    assert_eq!(body["equation_explanations"].as_array().unwrap().len(), 0);
    assert_eq!(body["results_explanation"], "A clear explanation.");
}

#[tokio::test]
async fn easy_tier_end_to_end() {
    let app = test_app(StubOracle::labelling("OTHER"), Some(methodology_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/easy_llm/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["level"], "easy");
    assert_eq!(body["explanation"], "A clear explanation.");
}

#[tokio::test]
async fn oracle_outage_is_service_unavailable() {
    let app = test_app(StubOracle::unavailable(), Some(methodology_paper()));
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/easy_llm/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unreadable_pdf_is_unprocessable() {
    let app = test_app(StubOracle::labelling("OTHER"), None);
    let file_id = upload(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(post(&format!("/explain/intermediate/{file_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(response).await["details"]
        .as_str()
        .unwrap()
        .contains("is not a PDF"));
}
