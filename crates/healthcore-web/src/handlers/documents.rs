//! Document upload, list, summary detail, edit and PDF.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use healthcore_common::DocumentType;
use healthcore_db::{Document, NewDocument, Summary};
use healthcore_ingestion::storage::{file_extension, sanitize_filename};
use healthcore_ingestion::FileKind;
use healthcore_llm::MedicalEntities;
use minijinja::{context, Value};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::error::{WebError, WebResult};
use crate::handlers::agents::pdf_download;
use crate::handlers::{display_time, NavUser};
use crate::render::{markdown_to_html, PdfContent};
use crate::state::SharedState;

pub const MSG_NO_FILE: &str = "Please choose a file to upload.";
pub const MSG_BAD_FILE_TYPE: &str = "Unsupported file type. Allowed types: PDF, JPG, JPEG, PNG.";
pub const MSG_BAD_DOC_TYPE: &str = "Select a valid document type.";
pub const MSG_TOO_LARGE: &str = "The file is too large to upload.";
pub const MSG_EMPTY_SUMMARY: &str = "The summary cannot be empty.";

#[derive(Debug, Serialize)]
struct DocumentRow {
    id: i64,
    original_filename: String,
    file_type: String,
    size_kb: String,
    status: &'static str,
    uploaded_at: String,
}

impl From<&Document> for DocumentRow {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            original_filename: doc.original_filename.clone(),
            file_type: doc.file_type.to_uppercase(),
            size_kb: format!("{:.1}", doc.file_size as f64 / 1024.0),
            status: doc.status.as_str(),
            uploaded_at: display_time(doc.uploaded_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct DocTypeOption {
    value: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct SummaryView {
    text: String,
    model_used: String,
    confidence: String,
    is_edited: bool,
    edited_at: Option<String>,
}

impl From<&Summary> for SummaryView {
    fn from(summary: &Summary) -> Self {
        Self {
            text: summary.final_text().to_string(),
            model_used: summary.model_used.clone(),
            confidence: format!("{:.0}%", summary.confidence_score * 100.0),
            is_edited: summary.is_edited,
            edited_at: summary.edited_at.map(display_time),
        }
    }
}

#[derive(Debug, Serialize)]
struct EntityRow {
    label: String,
    value: String,
}

#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub summary_text: String,
}

/// GET /documents
pub async fn document_list(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> WebResult<Html<String>> {
    let documents = state.documents.list_for_user(user.id()).await?;
    let rows: Vec<DocumentRow> = documents.iter().map(DocumentRow::from).collect();
    Ok(Html(state.render(
        "documents.html",
        context! { user => NavUser::from(&user), documents => rows },
    )?))
}

fn render_upload(
    state: &SharedState,
    user: &CurrentUser,
    selected: DocumentType,
    error: Option<&str>,
) -> WebResult<String> {
    let doc_types: Vec<DocTypeOption> = DocumentType::ALL
        .into_iter()
        .map(|t| DocTypeOption { value: t.as_str(), label: t.label() })
        .collect();
    Ok(state.render(
        "upload.html",
        context! {
            user => NavUser::from(user),
            doc_types => doc_types,
            selected => selected.as_str(),
            error => error,
        },
    )?)
}

/// GET /documents/upload
pub async fn upload_form(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> WebResult<Html<String>> {
    Ok(Html(render_upload(&state, &user, DocumentType::General, None)?))
}

#[derive(Debug, Default)]
struct UploadParts {
    file: Option<(String, Vec<u8>)>,
    doc_type: Option<String>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<UploadParts, MultipartError> {
    let mut parts = UploadParts::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                parts.file = Some((filename, bytes.to_vec()));
            }
            "doc_type" => parts.doc_type = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(parts)
}

/// POST /documents/upload: store, create, process, then back to the list.
pub async fn upload(
    State(state): State<SharedState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> WebResult<Response> {
    let parts = match read_upload(&mut multipart).await {
        Ok(parts) => parts,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(user_id = user.id(), limit = state.config.storage.max_upload_bytes, "Upload over size limit");
            return reject_upload(&state, &user, DocumentType::General, StatusCode::PAYLOAD_TOO_LARGE, MSG_TOO_LARGE);
        }
        Err(e) => return Err(WebError::BadRequest(e.body_text())),
    };

    let doc_type = match parts.doc_type.as_deref().map(str::trim) {
        None | Some("") => DocumentType::General,
        Some(raw) => match raw.parse::<DocumentType>() {
            Ok(t) => t,
            Err(_) => {
                return reject_upload(&state, &user, DocumentType::General, StatusCode::BAD_REQUEST, MSG_BAD_DOC_TYPE)
            }
        },
    };

    let (filename, bytes) = match parts.file {
        Some((name, bytes)) if !name.is_empty() && !bytes.is_empty() => (name, bytes),
        _ => return reject_upload(&state, &user, doc_type, StatusCode::BAD_REQUEST, MSG_NO_FILE),
    };
    // Checked against the name as it will be stored.
    if FileKind::from_extension(&file_extension(&sanitize_filename(&filename))).is_err() {
        return reject_upload(&state, &user, doc_type, StatusCode::BAD_REQUEST, MSG_BAD_FILE_TYPE);
    }

    let stored = state
        .store
        .save(&filename, &bytes)
        .await
        .map_err(|e| WebError::Internal(format!("storing upload: {e}")))?;

    let document = state
        .documents
        .create(&NewDocument {
            user_id: user.id(),
            file_path: stored.relative_path,
            original_filename: stored.original_filename,
            file_type: stored.file_type,
            file_size: i64::try_from(stored.size).unwrap_or(i64::MAX),
        })
        .await?;
    info!(document_id = document.id, user_id = user.id(), doc_type = %doc_type, "Document uploaded");

    let outcome = state.processor.process(document.id, user.id(), doc_type).await;
    if !outcome.is_success() {
        warn!(document_id = document.id, error = ?outcome.error, "Document processing failed");
    }

    Ok(Redirect::to("/documents").into_response())
}

fn reject_upload(
    state: &SharedState,
    user: &CurrentUser,
    selected: DocumentType,
    status: StatusCode,
    message: &str,
) -> WebResult<Response> {
    let html = render_upload(state, user, selected, Some(message))?;
    Ok((status, Html(html)).into_response())
}

async fn owned_document(state: &SharedState, user: &CurrentUser, id: i64) -> WebResult<Document> {
    state
        .documents
        .find_for_user(id, user.id())
        .await?
        .ok_or(WebError::NotFound)
}

async fn render_detail(
    state: &SharedState,
    user: &CurrentUser,
    document: &Document,
    edit_error: Option<&str>,
) -> WebResult<String> {
    let summary = state.summaries.latest_for_document(document.id).await?;

    let entities: Vec<EntityRow> = summary
        .as_ref()
        .map(|s| {
            serde_json::from_value::<MedicalEntities>(s.extracted_entities.0.clone())
                .unwrap_or_else(|_| MedicalEntities::not_extracted())
        })
        .map(|entities| {
            entities
                .rows()
                .iter()
                .map(|(label, value)| EntityRow { label: label.to_string(), value: value.to_string() })
                .collect()
        })
        .unwrap_or_default();

    let summary_html = summary
        .as_ref()
        .map(|s| Value::from_safe_string(markdown_to_html(s.final_text())));

    Ok(state.render(
        "document_detail.html",
        context! {
            user => NavUser::from(user),
            document => DocumentRow::from(document),
            summary => summary.as_ref().map(SummaryView::from),
            summary_html => summary_html,
            entities => entities,
            edit_error => edit_error,
        },
    )?)
}

/// GET /documents/{id}
pub async fn document_detail(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> WebResult<Html<String>> {
    let document = owned_document(&state, &user, id).await?;
    Ok(Html(render_detail(&state, &user, &document, None).await?))
}

/// POST /documents/{id}/summary
pub async fn save_summary_edit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<EditForm>,
) -> WebResult<Response> {
    let document = owned_document(&state, &user, id).await?;
    let summary = state
        .summaries
        .latest_for_document(document.id)
        .await?
        .ok_or(WebError::NotFound)?;

    let text = form.summary_text.trim();
    if text.is_empty() {
        let html = render_detail(&state, &user, &document, Some(MSG_EMPTY_SUMMARY)).await?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
    }
    state.summaries.update_edit(summary.id, text).await?;
    info!(document_id = document.id, summary_id = summary.id, "Summary edited");

    Ok(Redirect::to(&format!("/documents/{}", document.id)).into_response())
}

/// GET /documents/{id}/summary.pdf
pub async fn summary_pdf(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> WebResult<Response> {
    let document = owned_document(&state, &user, id).await?;
    let summary = state
        .summaries
        .latest_for_document(document.id)
        .await?
        .ok_or(WebError::NotFound)?;

    let mut meta = vec![
        format!("Document: {}", document.original_filename),
        format!("Generated: {}", display_time(summary.created_at)),
        format!("Model: {}", summary.model_used),
    ];
    if let Some(edited_at) = summary.edited_at.filter(|_| summary.is_edited) {
        meta.push(format!("Edited: {}", display_time(edited_at)));
    }
    let content = PdfContent {
        title: "Medical Document Summary".to_string(),
        meta,
        body: summary.final_text().to_string(),
    };
    pdf_download(content, &format!("summary-{}.pdf", document.id)).await
}
