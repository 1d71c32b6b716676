pub mod chunker;
pub mod classifier;
pub mod document;
pub mod equations;
pub mod error;
pub mod figures;
pub mod locator;
pub mod normalize;
pub mod oracle;
pub mod technical;

// Re-export commonly used types
pub use chunker::{MIN_CHUNK_CHARS, PageChunk, chunk_pages};
pub use classifier::{ChunkClassification, ChunkRole, ChunkRoleClassifier, SemanticChunk};
pub use document::{DocumentLoader, EmbeddedImage, LopdfLoader, Page, PageText, PaperDocument};
pub use equations::extract_equations;
pub use error::{ExtractionError, Result};
pub use figures::{Figure, FigureExtractor, FigureStore};
pub use locator::{LocatedSection, LocatorRule, SectionLocator};
pub use normalize::normalize_text;
pub use oracle::{HttpOracle, Oracle, OracleConfig, OracleError};
pub use technical::{TechnicalSource, TechnicalText, TechnicalTextExtractor};
