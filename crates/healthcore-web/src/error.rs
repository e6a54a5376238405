//! Web error type and its mapping onto HTTP responses.
//!
//! Vendor and database details are logged, never rendered.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use healthcore_db::DbError;
use healthcore_llm::LlmError;
use thiserror::Error;

pub const LLM_FAILURE_MESSAGE: &str = "The document could not be generated. Please try again later.";
pub const INTERNAL_FAILURE_MESSAGE: &str = "Something went wrong.";

#[derive(Debug, Error)]
pub enum WebError {
    #[error("not found")]
    NotFound,

    /// No valid session; `next` is the path to return to after login.
    #[error("login required")]
    Unauthorized { next: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type WebResult<T> = Result<T, WebError>;

/// `/login?next=<path>` with the path percent-encoded.
pub fn login_redirect_target(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/login?next={encoded}")
}

fn error_page(status: StatusCode, heading: &str, message: &str) -> Response {
    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{heading} | HealthCore</title><link rel="stylesheet" href="/static/healthcore.css"></head>
<body>
<main class="main-content">
    <div class="card alert-danger">
        <h1 class="page-title">{heading}</h1>
        <p>{message}</p>
        <p><a href="/">Back to HealthCore</a></p>
    </div>
</main>
</body>
</html>"#
    );
    (status, Html(body)).into_response()
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::NotFound => {
                error_page(StatusCode::NOT_FOUND, "Not found", "The page you requested does not exist.")
            }
            WebError::Unauthorized { next } => Redirect::to(&login_redirect_target(&next)).into_response(),
            WebError::BadRequest(msg) => {
                tracing::debug!(error = %msg, "Rejected request");
                error_page(StatusCode::BAD_REQUEST, "Bad request", "The submitted request could not be processed.")
            }
            WebError::Llm(e) => {
                tracing::error!(error = %e, "LLM call failed");
                error_page(StatusCode::BAD_GATEWAY, "Generation failed", LLM_FAILURE_MESSAGE)
            }
            WebError::Db(e) => {
                tracing::error!(error = %e, "Database error");
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Server error", INTERNAL_FAILURE_MESSAGE)
            }
            WebError::Render(e) => {
                tracing::error!(error = %e, "Template rendering failed");
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Server error", INTERNAL_FAILURE_MESSAGE)
            }
            WebError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Server error", INTERNAL_FAILURE_MESSAGE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_encodes_path() {
        assert_eq!(
            login_redirect_target("/agents/lab-report?x=1&y=2"),
            "/login?next=%2Fagents%2Flab-report%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(WebError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WebError::Unauthorized { next: "/".into() }.into_response().status(),
            StatusCode::SEE_OTHER
        );
        let llm = WebError::Llm(LlmError::Timeout(std::time::Duration::from_secs(60)));
        assert_eq!(llm.into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            WebError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
