//! Audit trail of LLM generation requests.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{AuditRecord, AuditStatus, NewAuditRecord};
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;

const AUDIT_COLUMNS: &str = "id, user_id, agent, inputs, prompt_chars, output, status, error, model, \
                             prompt_tokens, completion_tokens, output_sha256, latency_ms, created_at";

#[derive(Clone)]
pub struct AuditRepository {
    db: Arc<Database>,
}

impl AuditRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn record(&self, entry: &NewAuditRecord) -> Result<AuditRecord> {
        let record = sqlx::query_as::<_, AuditRecord>(&format!(
            "INSERT INTO audit_records (user_id, agent, inputs, prompt_chars, output, status, error, model, \
                                        prompt_tokens, completion_tokens, output_sha256, latency_ms, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {AUDIT_COLUMNS}"
        ))
        .bind(entry.user_id)
        .bind(&entry.agent)
        .bind(Json(&entry.inputs))
        .bind(entry.prompt_chars)
        .bind(entry.output.as_deref())
        .bind(entry.status.as_str())
        .bind(entry.error.as_deref())
        .bind(&entry.model)
        .bind(entry.prompt_tokens)
        .bind(entry.completion_tokens)
        .bind(entry.output_sha256.as_deref())
        .bind(entry.latency_ms)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        tracing::info!(
            audit_id = record.id,
            user_id = record.user_id,
            agent = %record.agent,
            status = %record.status,
            "Audit record written"
        );
        Ok(record)
    }

    pub async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<AuditRecord>> {
        let record = sqlx::query_as::<_, AuditRecord>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_records WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(record)
    }

    /// Newest first, at most `limit` rows.
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_records WHERE user_id = ? ORDER BY id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(records)
    }

    pub async fn count_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_records WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn count_by_status(&self, status: AuditStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_records WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}
