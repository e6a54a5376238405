//! Axum router: maps all URL paths to handlers.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    account::{login, login_form, logout},
    agents::{agent_form, agent_record, agent_record_pdf, agent_submit},
    audit::audit_log,
    documents::{document_detail, document_list, save_summary_edit, summary_pdf, upload, upload_form},
    home::{healthz, home, stylesheet},
};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",                               get(home))
        .route("/agents/{slug}",                  get(agent_form).post(agent_submit))
        .route("/agents/{slug}/records/{id}",     get(agent_record))
        .route("/agents/{slug}/records/{id}/pdf", get(agent_record_pdf))
        .route("/documents",                      get(document_list))
        .route("/documents/upload",               get(upload_form).post(upload))
        .route("/documents/{id}",                 get(document_detail))
        .route("/documents/{id}/summary",         post(save_summary_edit))
        .route("/documents/{id}/summary.pdf",     get(summary_pdf))
        .route("/audit",                          get(audit_log))

        // Account
        .route("/login",  get(login_form).post(login))
        .route("/logout", post(logout))

        // Operational
        .route("/healthz",               get(healthz))
        .route("/static/healthcore.css", get(stylesheet))

        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
