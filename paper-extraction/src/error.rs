use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid section pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
