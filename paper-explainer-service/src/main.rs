use anyhow::Context;
use paper_explainer_service::{AppConfig, create_app, telemetry::init_tracing};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_tracing();

    let app = create_app(&config)?;
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!(
        %addr,
        model = %config.oracle.model,
        upload_dir = %config.upload_dir.display(),
        figure_dir = %config.figure_dir.display(),
        "Paper Explainer Service starting"
    );
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
