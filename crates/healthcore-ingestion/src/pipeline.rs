//! Processing of a single uploaded document.
//!
//! Flow for one document:
//!   1. Mark it `processing`
//!   2. Extract text from the stored file
//!   3. Extract medical entities (falls back to placeholders)
//!   4. Generate the summary with the template for the declared type
//!   5. Store the text, the summary, and a success audit record
//!
//! Any failure marks the document `failed`; LLM failures also leave a
//! failed audit record. `process` reports failures in its outcome rather
//! than returning `Err`.

use std::sync::Arc;

use healthcore_common::DocumentType;
use healthcore_db::{
    AuditRepository, AuditStatus, Database, Document, DocumentRepository, DocumentStatus,
    NewAuditRecord, NewSummary, SummaryRepository,
};
use healthcore_llm::MedicalAssistant;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::extract::{extract_text, FileKind};
use crate::storage::UploadStore;

/// `agent` value on audit records written by upload processing.
pub const DOCUMENT_SUMMARY_AGENT: &str = "document-summary";

const SUMMARY_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub document_id: i64,
    pub status: DocumentStatus,
    pub summary_id: Option<i64>,
    pub error: Option<String>,
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        self.status == DocumentStatus::Completed
    }
}

#[derive(Clone)]
pub struct DocumentProcessingService {
    documents: DocumentRepository,
    summaries: SummaryRepository,
    audit: AuditRepository,
    assistant: MedicalAssistant,
    store: UploadStore,
}

impl DocumentProcessingService {
    pub fn new(db: Arc<Database>, assistant: MedicalAssistant, store: UploadStore) -> Self {
        Self {
            documents: DocumentRepository::new(db.clone()),
            summaries: SummaryRepository::new(db.clone()),
            audit: AuditRepository::new(db),
            assistant,
            store,
        }
    }

    #[instrument(skip(self))]
    pub async fn process(&self, document_id: i64, user_id: i64, doc_type: DocumentType) -> ProcessingOutcome {
        let document = match self.documents.find_for_user(document_id, user_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return failed(document_id, IngestionError::DocumentNotFound(document_id)),
            Err(e) => return failed(document_id, e.into()),
        };

        match self.run(&document, doc_type).await {
            Ok(summary_id) => {
                info!(document_id, summary_id, "Document processed");
                ProcessingOutcome {
                    document_id,
                    status: DocumentStatus::Completed,
                    summary_id: Some(summary_id),
                    error: None,
                }
            }
            Err(e) => {
                error!(document_id, error = %e, "Document processing failed");
                if let Err(db_err) = self.documents.set_status(document_id, DocumentStatus::Failed).await {
                    warn!(document_id, error = %db_err, "Could not mark document failed");
                }
                if let IngestionError::Llm(ref llm_err) = e {
                    let mut record = self.audit_entry(&document, doc_type, AuditStatus::Failed);
                    record.error = Some(llm_err.to_string());
                    if let Err(db_err) = self.audit.record(&record).await {
                        warn!(document_id, error = %db_err, "Could not write failed audit record");
                    }
                }
                failed(document_id, e)
            }
        }
    }

    async fn run(&self, document: &Document, doc_type: DocumentType) -> Result<i64> {
        self.documents.set_status(document.id, DocumentStatus::Processing).await?;

        let kind = FileKind::from_extension(&document.file_type)?;
        let path = self.store.path_of(&document.file_path);
        let text = tokio::task::spawn_blocking(move || extract_text(&path, kind))
            .await
            .map_err(|e| IngestionError::Task(e.to_string()))??;
        info!(document_id = document.id, chars = text.chars().count(), "Extracted document text");

        let entities = self.assistant.extract_entities(&text).await;
        let generation = self.assistant.generate_summary(&text, doc_type).await?;

        self.documents.mark_completed(document.id, &text).await?;
        let summary = self.summaries
            .create(&NewSummary {
                document_id: document.id,
                summary_text: generation.output.clone(),
                extracted_entities: serde_json::to_value(&entities).unwrap_or_else(|_| json!({})),
                model_used: self.assistant.model_id().to_string(),
                confidence_score: SUMMARY_CONFIDENCE,
            })
            .await?;

        let mut record = self.audit_entry(document, doc_type, AuditStatus::Success);
        record.prompt_chars = generation.prompt.chars().count() as i64;
        record.output = Some(generation.output);
        record.model = generation.metrics.model;
        record.prompt_tokens = i64::from(generation.metrics.prompt_tokens);
        record.completion_tokens = i64::from(generation.metrics.completion_tokens);
        record.output_sha256 = Some(generation.metrics.output_sha256);
        record.latency_ms = generation.metrics.latency_ms as i64;
        self.audit.record(&record).await?;

        Ok(summary.id)
    }

    fn audit_entry(&self, document: &Document, doc_type: DocumentType, status: AuditStatus) -> NewAuditRecord {
        NewAuditRecord {
            user_id: document.user_id,
            agent: DOCUMENT_SUMMARY_AGENT.to_string(),
            inputs: json!({
                "document_id": document.id,
                "original_filename": document.original_filename,
                "doc_type": doc_type.as_str(),
            }),
            prompt_chars: 0,
            output: None,
            status,
            error: None,
            model: self.assistant.model_id().to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            output_sha256: None,
            latency_ms: 0,
        }
    }
}

fn failed(document_id: i64, e: IngestionError) -> ProcessingOutcome {
    ProcessingOutcome {
        document_id,
        status: DocumentStatus::Failed,
        summary_id: None,
        error: Some(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_pdf::write_pdf;
    use async_trait::async_trait;
    use healthcore_db::{NewDocument, UserRepository};
    use healthcore_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
    use std::sync::Mutex;

    const ENTITIES_REPLY: &str = r#"```json
{"patient_info": "John Doe, 45", "chief_complaint": "Chest pain", "symptoms": "chest pain",
 "diagnosis": "Hypertension", "medications": "Amlodipine 5mg", "treatment_plan": "Follow up",
 "vitals": "BP 145/95"}
```"#;

    struct ScriptedBackend {
        replies: Mutex<Vec<std::result::Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
            self.prompts.lock().unwrap().push(req.messages[0].content.clone());
            let content = self.replies.lock().unwrap().remove(0)?;
            Ok(LlmResponse { content, model: "scripted-1".to_string(), prompt_tokens: 5, completion_tokens: 9 })
        }
        fn model_id(&self) -> &str { "scripted-1" }
        fn backend_name(&self) -> &str { "scripted" }
    }

    struct Fixture {
        service: DocumentProcessingService,
        backend: Arc<ScriptedBackend>,
        db: Arc<Database>,
        user_id: i64,
        _media: tempfile::TempDir,
    }

    async fn fixture(replies: Vec<std::result::Result<String, LlmError>>) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let db = Arc::new(db);
        let user_id = UserRepository::new(db.clone()).create("alice", "h", false).await.unwrap().id;

        let media = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend { replies: Mutex::new(replies), prompts: Mutex::new(Vec::new()) });
        let service = DocumentProcessingService::new(
            db.clone(),
            MedicalAssistant::new(backend.clone()),
            UploadStore::new(media.path()),
        );
        Fixture { service, backend, db, user_id, _media: media }
    }

    async fn upload(f: &Fixture, name: &str, pdf_lines: Option<&[&str]>) -> i64 {
        let file_path = format!("documents/{name}");
        let full = f.service.store.path_of(&file_path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        match pdf_lines {
            Some(lines) => write_pdf(&full, lines),
            None => std::fs::write(&full, b"binary").unwrap(),
        }
        DocumentRepository::new(f.db.clone())
            .create(&NewDocument {
                user_id: f.user_id,
                file_path,
                original_filename: name.to_string(),
                file_type: crate::storage::file_extension(name),
                file_size: 100,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_pdf_is_summarised_and_audited() {
        let f = fixture(vec![Ok(ENTITIES_REPLY.to_string()), Ok("  Patient stable.  ".to_string())]).await;
        let doc_id = upload(&f, "visit.pdf", Some(&["Patient John Doe BP 145 over 95"])).await;

        let outcome = f.service.process(doc_id, f.user_id, DocumentType::General).await;
        assert!(outcome.is_success(), "{outcome:?}");

        let doc = DocumentRepository::new(f.db.clone()).find_by_id(doc_id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert!(doc.extracted_text.contains("John Doe"));

        let summary = SummaryRepository::new(f.db.clone()).latest_for_document(doc_id).await.unwrap().unwrap();
        assert_eq!(Some(summary.id), outcome.summary_id);
        assert_eq!(summary.summary_text, "Patient stable.");
        assert_eq!(summary.model_used, "scripted-1");
        assert!((summary.confidence_score - 0.85).abs() < f64::EPSILON);
        assert_eq!(summary.extracted_entities.0["diagnosis"], "Hypertension");

        let audit = AuditRepository::new(f.db.clone());
        let records = audit.list_for_user(f.user_id, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent, DOCUMENT_SUMMARY_AGENT);
        assert_eq!(records[0].status, AuditStatus::Success);
        assert_eq!(records[0].completion_tokens, 9);

        let prompts = f.backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("Extract the following information"));
        assert!(prompts[1].contains("summary of this medical document"));
    }

    #[tokio::test]
    async fn test_typed_document_uses_agent_template() {
        let f = fixture(vec![Ok("garbled".to_string()), Ok("**LABORATORY REPORT SUMMARY**".to_string())]).await;
        let doc_id = upload(&f, "labs.pdf", Some(&["WBC 14.2 high"])).await;

        let outcome = f.service.process(doc_id, f.user_id, DocumentType::LabReport).await;
        assert!(outcome.is_success());

        let summary = SummaryRepository::new(f.db.clone()).latest_for_document(doc_id).await.unwrap().unwrap();
        assert_eq!(summary.extracted_entities.0["diagnosis"], "Not extracted");
        let prompts = f.backend.prompts.lock().unwrap();
        assert!(prompts[1].starts_with("You are a clinical laboratory specialist"));
    }

    #[tokio::test]
    async fn test_llm_failure_marks_failed_and_audits() {
        let f = fixture(vec![
            Ok(ENTITIES_REPLY.to_string()),
            Err(LlmError::ApiError { status: 500, message: "internal".to_string() }),
        ])
        .await;
        let doc_id = upload(&f, "visit.pdf", Some(&["Some clinical text"])).await;

        let outcome = f.service.process(doc_id, f.user_id, DocumentType::General).await;
        assert_eq!(outcome.status, DocumentStatus::Failed);
        assert!(outcome.error.unwrap().contains("internal"));

        let doc = DocumentRepository::new(f.db.clone()).find_by_id(doc_id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(SummaryRepository::new(f.db.clone()).latest_for_document(doc_id).await.unwrap().is_none());

        let records = AuditRepository::new(f.db.clone()).list_for_user(f.user_id, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AuditStatus::Failed);
        assert!(records[0].output.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_without_llm_call() {
        let f = fixture(vec![]).await;
        let doc_id = upload(&f, "notes.docx", None).await;

        let outcome = f.service.process(doc_id, f.user_id, DocumentType::General).await;
        assert_eq!(outcome.error.as_deref(), Some("Unsupported file type: docx"));
        assert!(f.backend.prompts.lock().unwrap().is_empty());
        assert_eq!(AuditRepository::new(f.db.clone()).count_for_user(f.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_image_uses_placeholder_text() {
        let f = fixture(vec![Ok(ENTITIES_REPLY.to_string()), Ok("summary".to_string())]).await;
        let doc_id = upload(&f, "scan.png", None).await;

        let outcome = f.service.process(doc_id, f.user_id, DocumentType::General).await;
        assert!(outcome.is_success());
        let doc = DocumentRepository::new(f.db.clone()).find_by_id(doc_id).await.unwrap().unwrap();
        assert_eq!(doc.extracted_text, crate::extract::OCR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_other_users_document_is_not_found() {
        let f = fixture(vec![]).await;
        let doc_id = upload(&f, "visit.pdf", Some(&["text"])).await;

        let outcome = f.service.process(doc_id, f.user_id + 1, DocumentType::General).await;
        assert_eq!(outcome.status, DocumentStatus::Failed);
        let doc = DocumentRepository::new(f.db.clone()).find_by_id(doc_id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
    }
}
