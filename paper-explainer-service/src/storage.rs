use std::path::PathBuf;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ExplainError;

/// Flat directory of uploaded PDFs named `{uuid}.pdf`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn validate_pdf_filename(filename: &str) -> Result<(), ExplainError> {
        if filename.to_lowercase().ends_with(".pdf") {
            Ok(())
        } else {
            Err(ExplainError::InvalidUpload(format!(
                "'{filename}' does not have a .pdf extension"
            )))
        }
    }

    /// Store the bytes under a fresh identifier and return it.
    pub async fn save_pdf(&self, data: &[u8]) -> Result<String, ExplainError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_id = Uuid::new_v4().to_string();
        let path = self.path_for(&file_id);
        tokio::fs::write(&path, data).await?;
        info!(%file_id, bytes = data.len(), path = %path.display(), "PDF stored");
        Ok(file_id)
    }

    /// Path of a previously stored PDF. Identifiers that are not UUIDs never
    /// touch the filesystem.
    pub async fn resolve(&self, file_id: &str) -> Result<PathBuf, ExplainError> {
        let not_found = || ExplainError::DocumentNotFound(file_id.to_string());

        let id = Uuid::parse_str(file_id).map_err(|_| {
            debug!(file_id, "Rejecting malformed file id");
            not_found()
        })?;
        let path = self.path_for(&id.to_string());

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            Ok(false) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, file_id: &str) -> PathBuf {
        self.dir.join(format!("{file_id}.pdf"))
    }
}
