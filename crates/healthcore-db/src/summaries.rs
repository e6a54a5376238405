//! Document summaries.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{NewSummary, Summary};
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;

const SUMMARY_COLUMNS: &str = "id, document_id, summary_text, extracted_entities, model_used, \
                               confidence_score, is_edited, edited_text, created_at, edited_at";

#[derive(Clone)]
pub struct SummaryRepository {
    db: Arc<Database>,
}

impl SummaryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, summary: &NewSummary) -> Result<Summary> {
        let created = sqlx::query_as::<_, Summary>(&format!(
            "INSERT INTO summaries (document_id, summary_text, extracted_entities, model_used, confidence_score, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {SUMMARY_COLUMNS}"
        ))
        .bind(summary.document_id)
        .bind(&summary.summary_text)
        .bind(Json(&summary.extracted_entities))
        .bind(&summary.model_used)
        .bind(summary.confidence_score)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;
        Ok(created)
    }

    /// The most recently created summary (greatest id) for a document.
    pub async fn latest_for_document(&self, document_id: i64) -> Result<Option<Summary>> {
        let summary = sqlx::query_as::<_, Summary>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE document_id = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(document_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(summary)
    }

    pub async fn update_edit(&self, id: i64, edited_text: &str) -> Result<Summary> {
        let updated = sqlx::query_as::<_, Summary>(&format!(
            "UPDATE summaries SET edited_text = ?, is_edited = 1, edited_at = ? WHERE id = ? \
             RETURNING {SUMMARY_COLUMNS}"
        ))
        .bind(edited_text)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        updated.ok_or_else(|| DbError::NotFound(format!("summary {id}")))
    }
}
