use healthcore_db::DbError;
use healthcore_llm::LlmError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestionError>;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error extracting PDF text: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No text could be extracted from document")]
    NoText,

    #[error("Document {0} not found")]
    DocumentNotFound(i64),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Extraction task failed: {0}")]
    Task(String),
}
