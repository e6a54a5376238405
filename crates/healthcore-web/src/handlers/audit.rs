//! The current user's audit log.

use axum::extract::State;
use axum::response::Html;
use healthcore_common::AgentKind;
use healthcore_db::{AuditRecord, AuditStatus};
use minijinja::context;
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::handlers::{display_time, NavUser};
use crate::state::SharedState;

pub const AUDIT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Serialize)]
struct AuditRow {
    id: i64,
    agent: String,
    status: &'static str,
    error: Option<String>,
    model: String,
    prompt_tokens: i64,
    completion_tokens: i64,
    latency_ms: i64,
    created_at: String,
    link: Option<String>,
}

impl From<AuditRecord> for AuditRow {
    fn from(record: AuditRecord) -> Self {
        let kind = record.agent.parse::<AgentKind>().ok();
        let link = kind
            .filter(|_| record.status == AuditStatus::Success)
            .map(|k| format!("/agents/{}/records/{}", k.slug(), record.id));
        Self {
            id: record.id,
            agent: kind.map(|k| k.title().to_string()).unwrap_or(record.agent),
            status: record.status.as_str(),
            error: record.error,
            model: record.model,
            prompt_tokens: record.prompt_tokens,
            completion_tokens: record.completion_tokens,
            latency_ms: record.latency_ms,
            created_at: display_time(record.created_at),
            link,
        }
    }
}

/// GET /audit
pub async fn audit_log(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> WebResult<Html<String>> {
    let records = state.audit.list_for_user(user.id(), AUDIT_PAGE_SIZE).await?;
    let rows: Vec<AuditRow> = records.into_iter().map(AuditRow::from).collect();
    Ok(Html(state.render(
        "audit.html",
        context! { user => NavUser::from(&user), records => rows },
    )?))
}
