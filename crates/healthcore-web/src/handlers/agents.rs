//! Agent form, generation and stored-record views.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use healthcore_common::AgentKind;
use healthcore_db::{AuditRecord, AuditStatus, NewAuditRecord};
use healthcore_llm::prompts;
use minijinja::{context, Value};
use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::CurrentUser;
use crate::error::{WebError, WebResult};
use crate::forms::{self, FieldSpec, FormErrors, ValidatedForm};
use crate::handlers::home::AgentCard;
use crate::handlers::{display_time, NavUser};
use crate::render::{markdown_to_html, missing_sections, render_pdf, PdfContent};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
struct FieldView<'a> {
    #[serde(flatten)]
    spec: &'a FieldSpec,
    value: &'a str,
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InputRow {
    label: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct RecordView {
    id: i64,
    model: String,
    created_at: String,
}

fn agent_from_slug(slug: &str) -> WebResult<AgentKind> {
    slug.parse().map_err(|_| WebError::NotFound)
}

fn render_form(
    state: &SharedState,
    user: &CurrentUser,
    kind: AgentKind,
    errors: &FormErrors,
) -> WebResult<String> {
    let fields: Vec<FieldView<'_>> = forms::fields_for(kind)
        .iter()
        .map(|spec| FieldView {
            spec,
            value: errors.values.get(spec.name).map(String::as_str).unwrap_or_default(),
            error: errors.errors.get(spec.name).map(String::as_str),
        })
        .collect();
    Ok(state.render(
        "agent_form.html",
        context! {
            user => NavUser::from(user),
            agent => AgentCard::from(kind),
            fields => fields,
            errors => !errors.errors.is_empty(),
        },
    )?)
}

fn render_document(
    state: &SharedState,
    user: &CurrentUser,
    kind: AgentKind,
    record: &AuditRecord,
) -> WebResult<String> {
    let output = record.output.as_deref().unwrap_or_default();
    let inputs: Vec<InputRow> = forms::fields_for(kind)
        .iter()
        .map(|spec| InputRow {
            label: spec.label.to_string(),
            value: record
                .inputs
                .0
                .get(spec.name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    Ok(state.render(
        "agent_document.html",
        context! {
            user => NavUser::from(user),
            agent => AgentCard::from(kind),
            record => RecordView {
                id: record.id,
                model: record.model.clone(),
                created_at: display_time(record.created_at),
            },
            inputs => inputs,
            missing_sections => missing_sections(kind, output),
            document_html => Value::from_safe_string(markdown_to_html(output)),
        },
    )?)
}

/// GET /agents/{slug}
pub async fn agent_form(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(slug): Path<String>,
) -> WebResult<Html<String>> {
    let kind = agent_from_slug(&slug)?;
    Ok(Html(render_form(&state, &user, kind, &FormErrors::default())?))
}

/// POST /agents/{slug}
#[instrument(skip_all, fields(agent = %slug, user_id = user.id()))]
pub async fn agent_submit(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(slug): Path<String>,
    Form(submitted): Form<HashMap<String, String>>,
) -> WebResult<Response> {
    let kind = agent_from_slug(&slug)?;

    let form = match forms::validate(kind, &submitted) {
        Ok(form) => form,
        Err(errors) => {
            let html = render_form(&state, &user, kind, &errors)?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    let record = generate(&state, &user, kind, &form).await?;
    Ok(Html(render_document(&state, &user, kind, &record)?).into_response())
}

/// Run the agent and write the audit record, successful or not.
async fn generate(
    state: &SharedState,
    user: &CurrentUser,
    kind: AgentKind,
    form: &ValidatedForm,
) -> WebResult<AuditRecord> {
    let input = form.to_agent_input();

    match state.assistant.generate_agent_document(kind, &input).await {
        Ok(generation) => {
            let metrics = &generation.metrics;
            let record = state
                .audit
                .record(&NewAuditRecord {
                    user_id: user.id(),
                    agent: kind.slug().to_string(),
                    inputs: form.to_json(),
                    prompt_chars: generation.prompt.chars().count() as i64,
                    output: Some(generation.output.clone()),
                    status: AuditStatus::Success,
                    error: None,
                    model: metrics.model.clone(),
                    prompt_tokens: i64::from(metrics.prompt_tokens),
                    completion_tokens: i64::from(metrics.completion_tokens),
                    output_sha256: Some(metrics.output_sha256.clone()),
                    latency_ms: metrics.latency_ms as i64,
                })
                .await?;
            info!(agent = %kind, record_id = record.id, "Agent document generated");
            Ok(record)
        }
        Err(e) => {
            let prompt_chars = prompts::build_agent_prompt(kind, &input)
                .map(|p| p.chars().count() as i64)
                .unwrap_or_default();
            state
                .audit
                .record(&NewAuditRecord {
                    user_id: user.id(),
                    agent: kind.slug().to_string(),
                    inputs: form.to_json(),
                    prompt_chars,
                    output: None,
                    status: AuditStatus::Failed,
                    error: Some(e.to_string()),
                    model: state.assistant.model_id().to_string(),
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    output_sha256: None,
                    latency_ms: 0,
                })
                .await?;
            Err(WebError::Llm(e))
        }
    }
}

/// A successful record of `kind` owned by `user`; anything else is a 404.
async fn find_record(
    state: &SharedState,
    user: &CurrentUser,
    kind: AgentKind,
    id: i64,
) -> WebResult<AuditRecord> {
    state
        .audit
        .find_for_user(id, user.id())
        .await?
        .filter(|r| r.agent == kind.slug() && r.status == AuditStatus::Success && r.output.is_some())
        .ok_or(WebError::NotFound)
}

/// GET /agents/{slug}/records/{id}
pub async fn agent_record(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
) -> WebResult<Html<String>> {
    let kind = agent_from_slug(&slug)?;
    let record = find_record(&state, &user, kind, id).await?;
    Ok(Html(render_document(&state, &user, kind, &record)?))
}

/// GET /agents/{slug}/records/{id}/pdf
pub async fn agent_record_pdf(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path((slug, id)): Path<(String, i64)>,
) -> WebResult<Response> {
    let kind = agent_from_slug(&slug)?;
    let record = find_record(&state, &user, kind, id).await?;

    let mut meta = vec![
        format!("Generated: {}", display_time(record.created_at)),
        format!("Agent: {}", kind.title()),
    ];
    if let Some(patient) = record.inputs.0.get("patient_name").and_then(|v| v.as_str()) {
        meta.push(format!("Patient: {patient}"));
    }
    let content = PdfContent {
        title: kind.document_heading().to_string(),
        meta,
        body: record.output.unwrap_or_default(),
    };
    let filename = format!("{}-{}.pdf", kind.slug(), record.id);
    pdf_download(content, &filename).await
}

/// Render off the async workers and wrap as an attachment.
pub(crate) async fn pdf_download(content: PdfContent, filename: &str) -> WebResult<Response> {
    let bytes = tokio::task::spawn_blocking(move || render_pdf(&content))
        .await
        .map_err(|e| WebError::Internal(e.to_string()))??;
    Ok(pdf_response(bytes, filename))
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response()
}
