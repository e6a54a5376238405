//! Row types for the SQLite tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;

use crate::error::DbError;

// =============================================================================
// Users & sessions
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending    => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed  => "completed",
            DocumentStatus::Failed     => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for DocumentStatus {
    type Error = DbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending"    => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed"  => Ok(DocumentStatus::Completed),
            "failed"     => Ok(DocumentStatus::Failed),
            _ => Err(DbError::InvalidValue(format!("document status '{value}'"))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    /// Relative to the media root.
    pub file_path: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: i64,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub extracted_text: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i64,
    pub file_path: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: i64,
}

// =============================================================================
// Summaries
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct Summary {
    pub id: i64,
    pub document_id: i64,
    pub summary_text: String,
    pub extracted_entities: Json<serde_json::Value>,
    pub model_used: String,
    pub confidence_score: f64,
    pub is_edited: bool,
    pub edited_text: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Summary {
    /// The edited text once a user has edited the summary, else the generated one.
    pub fn final_text(&self) -> &str {
        if self.is_edited { &self.edited_text } else { &self.summary_text }
    }
}

#[derive(Debug, Clone)]
pub struct NewSummary {
    pub document_id: i64,
    pub summary_text: String,
    pub extracted_entities: serde_json::Value,
    pub model_used: String,
    pub confidence_score: f64,
}

// =============================================================================
// Audit records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failed  => "failed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AuditStatus {
    type Error = DbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "success" => Ok(AuditStatus::Success),
            "failed"  => Ok(AuditStatus::Failed),
            _ => Err(DbError::InvalidValue(format!("audit status '{value}'"))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: i64,
    /// Agent slug, or `document-summary` for upload processing.
    pub agent: String,
    pub inputs: Json<serde_json::Value>,
    pub prompt_chars: i64,
    pub output: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AuditStatus,
    pub error: Option<String>,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub output_sha256: Option<String>,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: i64,
    pub agent: String,
    pub inputs: serde_json::Value,
    pub prompt_chars: i64,
    pub output: Option<String>,
    pub status: AuditStatus,
    pub error: Option<String>,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub output_sha256: Option<String>,
    pub latency_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_roundtrip() {
        for s in [DocumentStatus::Pending, DocumentStatus::Processing, DocumentStatus::Completed, DocumentStatus::Failed] {
            assert_eq!(DocumentStatus::try_from(s.as_str().to_string()).unwrap(), s);
        }
        assert!(AuditStatus::try_from("partial".to_string()).is_err());
    }

    #[test]
    fn test_final_text_prefers_edit() {
        let mut summary = Summary {
            id: 1,
            document_id: 1,
            summary_text: "generated".to_string(),
            extracted_entities: Json(serde_json::json!({})),
            model_used: "m".to_string(),
            confidence_score: 0.85,
            is_edited: false,
            edited_text: String::new(),
            created_at: Utc::now(),
            edited_at: None,
        };
        assert_eq!(summary.final_text(), "generated");
        summary.is_edited = true;
        summary.edited_text = "edited".to_string();
        assert_eq!(summary.final_text(), "edited");
    }
}
