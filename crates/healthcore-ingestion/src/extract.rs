//! Text extraction from stored uploads.

use std::path::Path;

use lopdf::Document as PdfDoc;
use tracing::{debug, warn};

use crate::error::{IngestionError, Result};

pub const OCR_PLACEHOLDER: &str = "OCR functionality coming soon. Upload PDF documents for now.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Accepts `pdf`, `jpg`, `jpeg`, `png` in any case.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "jpg" | "jpeg" | "png" => Ok(FileKind::Image),
            other => Err(IngestionError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Blocking; run it off the async runtime for large files.
pub fn extract_text(path: &Path, kind: FileKind) -> Result<String> {
    let text = match kind {
        FileKind::Pdf => extract_pdf_text(path)?,
        // TODO: wire an OCR engine for scanned images
        FileKind::Image => OCR_PLACEHOLDER.to_string(),
    };
    if text.trim().is_empty() {
        return Err(IngestionError::NoText);
    }
    Ok(text)
}

fn extract_pdf_text(path: &Path) -> Result<String> {
    let pdf = PdfDoc::load(path)?;

    let mut pages = Vec::new();
    for page_num in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page_num]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim_end().to_string()),
            Ok(_) => {}
            Err(e) => warn!(page = page_num, error = %e, "Skipping unreadable PDF page"),
        }
    }

    let text = pages.join("\n").trim().to_string();
    debug!(path = %path.display(), chars = text.chars().count(), "PDF text extracted");
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_extension("PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_extension("jpeg").unwrap(), FileKind::Image);
        assert_eq!(FileKind::from_extension("png").unwrap(), FileKind::Image);
        let err = FileKind::from_extension("docx").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: docx");
    }

    #[test]
    fn test_image_returns_placeholder() {
        let text = extract_text(Path::new("/nonexistent/scan.png"), FileKind::Image).unwrap();
        assert_eq!(text, OCR_PLACEHOLDER);
    }

    #[test]
    fn test_pdf_pages_are_joined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.pdf");
        test_pdf::write_pdf(&path, &["Patient John Doe", "BP 145 over 95"]);

        let text = extract_text(&path, FileKind::Pdf).unwrap();
        assert!(text.contains("Patient John Doe"));
        assert!(text.contains("BP 145 over 95"));
        assert!(text.find("Patient").unwrap() < text.find("BP").unwrap());
    }

    #[test]
    fn test_pdf_without_text_is_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        test_pdf::write_pdf(&path, &[]);
        assert!(matches!(extract_text(&path, FileKind::Pdf), Err(IngestionError::NoText)));
    }

    #[test]
    fn test_garbage_pdf_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(extract_text(&path, FileKind::Pdf), Err(IngestionError::Pdf(_))));
    }
}
