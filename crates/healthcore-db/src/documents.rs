//! Uploaded document repository.
//!
//! Every read that takes a `user_id` is scoped to that user.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{Document, DocumentStatus, NewDocument};
use chrono::Utc;
use std::sync::Arc;

const DOCUMENT_COLUMNS: &str = "id, user_id, file_path, original_filename, file_type, file_size, \
                                status, uploaded_at, processed_at, extracted_text";

#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, doc: &NewDocument) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "INSERT INTO documents (user_id, file_path, original_filename, file_type, file_size, status, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(doc.user_id)
        .bind(&doc.file_path)
        .bind(&doc.original_filename)
        .bind(&doc.file_type)
        .bind(doc.file_size)
        .bind(DocumentStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;
        Ok(document)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(document)
    }

    pub async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(document)
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = ? ORDER BY id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(documents)
    }

    pub async fn set_status(&self, id: i64, status: DocumentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("document {id}")));
        }
        tracing::debug!(document_id = id, status = %status, "Document status updated");
        Ok(())
    }

    /// Store the extracted text, set `completed` and stamp `processed_at`.
    pub async fn mark_completed(&self, id: i64, extracted_text: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET status = ?, extracted_text = ?, processed_at = ? WHERE id = ?",
        )
        .bind(DocumentStatus::Completed.as_str())
        .bind(extracted_text)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("document {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_db, test_user};

    fn new_doc(user_id: i64, name: &str) -> NewDocument {
        NewDocument {
            user_id,
            file_path: format!("documents/2026/01/02/abc_{name}"),
            original_filename: name.to_string(),
            file_type: "pdf".to_string(),
            file_size: 1234,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let db = test_db().await;
        let user_id = test_user(&db, "alice").await;
        let repo = DocumentRepository::new(db);

        let doc = repo.create(&new_doc(user_id, "note.pdf")).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.processed_at.is_none());
        assert_eq!(doc.extracted_text, "");
    }

    #[tokio::test]
    async fn test_scoped_lookup_hides_other_users() {
        let db = test_db().await;
        let alice = test_user(&db, "alice").await;
        let bob = test_user(&db, "bob").await;
        let repo = DocumentRepository::new(db);

        let doc = repo.create(&new_doc(alice, "a.pdf")).await.unwrap();
        assert!(repo.find_for_user(doc.id, alice).await.unwrap().is_some());
        assert!(repo.find_for_user(doc.id, bob).await.unwrap().is_none());
        assert!(repo.list_for_user(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = test_db().await;
        let alice = test_user(&db, "alice").await;
        let repo = DocumentRepository::new(db);

        let first = repo.create(&new_doc(alice, "first.pdf")).await.unwrap();
        let second = repo.create(&new_doc(alice, "second.pdf")).await.unwrap();
        let ids: Vec<i64> = repo.list_for_user(alice).await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = test_db().await;
        let alice = test_user(&db, "alice").await;
        let repo = DocumentRepository::new(db);

        let doc = repo.create(&new_doc(alice, "x.pdf")).await.unwrap();
        repo.set_status(doc.id, DocumentStatus::Processing).await.unwrap();
        repo.mark_completed(doc.id, "Patient: John Doe").await.unwrap();

        let doc = repo.find_by_id(doc.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.extracted_text, "Patient: John Doe");
        assert!(doc.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_document_status_update() {
        let repo = DocumentRepository::new(test_db().await);
        let err = repo.set_status(99, DocumentStatus::Failed).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
