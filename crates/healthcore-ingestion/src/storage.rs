//! Upload storage under the media root.
//!
//! Files land in `documents/YYYY/MM/DD/<uuid>_<name>`; the stored path is
//! relative to the media root so the root can move.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub relative_path: String,
    pub original_filename: String,
    /// Lowercased extension, empty when the name has none.
    pub file_type: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    media_root: PathBuf,
}

impl UploadStore {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self { media_root: media_root.into() }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }

    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredFile> {
        let name = sanitize_filename(original_filename);
        let dir = format!("documents/{}", Utc::now().format("%Y/%m/%d"));
        let relative_path = format!("{dir}/{}_{name}", Uuid::new_v4().simple());

        tokio::fs::create_dir_all(self.media_root.join(&dir)).await?;
        tokio::fs::write(self.path_of(&relative_path), bytes).await?;
        debug!(path = %relative_path, size = bytes.len(), "Upload stored");

        Ok(StoredFile {
            file_type: file_extension(&name),
            original_filename: name,
            relative_path,
            size: bytes.len() as u64,
        })
    }
}

/// Keep only the final path component and a conservative character set.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "upload".to_string() } else { cleaned }
}

pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
