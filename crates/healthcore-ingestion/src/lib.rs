//! healthcore-ingestion — uploaded document pipeline.
//! - Upload storage under the media root
//! - Text extraction (PDF via lopdf; images are a placeholder)
//! - Entity extraction and summary generation through the LLM assistant

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod storage;

pub use error::{IngestionError, Result};
pub use extract::{extract_text, FileKind, OCR_PLACEHOLDER};
pub use pipeline::{DocumentProcessingService, ProcessingOutcome, DOCUMENT_SUMMARY_AGENT};
pub use storage::{StoredFile, UploadStore};
