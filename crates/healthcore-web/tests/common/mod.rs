//! Shared fixtures for the router tests: in-memory database, scripted LLM
//! backend, temporary media root and logged-in users.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use healthcore_common::AgentKind;
use healthcore_config::Config;
use healthcore_db::{AuditRecord, AuditRepository, Database, SessionRepository, UserRepository};
use healthcore_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse, MedicalAssistant};
use healthcore_web::auth::{hash_password, SessionKey};
use healthcore_web::{build_router, AppState};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cret-pass";
pub const SECRET_KEY: &str = "test-secret-key";

/// Replays canned replies in order and records every request.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(req);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::EmptyResponse { reason: "script exhausted".into() }))?;
        Ok(LlmResponse {
            content: reply,
            model: "gemini-test".to_string(),
            prompt_tokens: 120,
            completion_tokens: 80,
        })
    }

    fn model_id(&self) -> &str {
        "gemini-test"
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}

pub fn vendor_down() -> LlmError {
    LlmError::ApiError { status: 503, message: "The model is overloaded".to_string() }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub backend: Arc<ScriptedBackend>,
    pub media: TempDir,
    pub session_key: SessionKey,
}

impl TestApp {
    pub async fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self::with_config(replies, |_| {}).await
    }

    /// Like `new`, with a hook to adjust the config before the router is built.
    pub async fn with_config(replies: Vec<Result<String, LlmError>>, adjust: impl FnOnce(&mut Config)) -> Self {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let db = Arc::new(db);

        let media = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.media_root = media.path().to_string_lossy().into_owned();
        config.security.secret_key = Some(SecretString::from(SECRET_KEY.to_string()));
        adjust(&mut config);

        let session_key = SessionKey::new(&SecretString::from(SECRET_KEY.to_string())).unwrap();
        let backend = ScriptedBackend::new(replies);
        let assistant = MedicalAssistant::new(backend.clone());
        let state = AppState::new(db.clone(), assistant, config).unwrap();

        Self { router: build_router(state), db, backend, media, session_key }
    }

    /// Create a user and return `(user_id, cookie header value)`.
    pub async fn login(&self, username: &str) -> (i64, String) {
        self.login_as(username, false).await
    }

    pub async fn login_as(&self, username: &str, is_staff: bool) -> (i64, String) {
        let hash = hash_password(PASSWORD).unwrap();
        let user = UserRepository::new(self.db.clone()).create(username, &hash, is_staff).await.unwrap();
        let token = SessionKey::new_token();
        SessionRepository::new(self.db.clone())
            .create(user.id, &self.session_key.digest(&token), Duration::from_secs(3600))
            .await
            .unwrap();
        (user.id, format!("hc_session={token}"))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, pairs: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn upload(&self, cookie: &str, filename: &str, doc_type: &str, bytes: &[u8]) -> Response<Body> {
        const BOUNDARY: &str = "healthcore-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"doc_type\"\r\n\r\n{doc_type}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/documents/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn audit_records(&self, user_id: i64) -> Vec<AuditRecord> {
        AuditRepository::new(self.db.clone()).list_for_user(user_id, 100).await.unwrap()
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub fn location(response: &Response<Body>) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// A valid submission for each agent.
pub fn valid_form(kind: AgentKind) -> Vec<(&'static str, &'static str)> {
    match kind {
        AgentKind::DischargeSummary => vec![
            ("patient_name", "John Doe"),
            ("admission_date", "2026-03-01"),
            ("discharge_date", "2026-03-05"),
            ("clinical_notes", "Admitted with right lower lobe pneumonia. Treated with IV ceftriaxone."),
        ],
        AgentKind::ReferralLetter => vec![
            ("patient_name", "Jane Roe"),
            ("referring_physician", "Dr. Smith"),
            ("specialty", "Cardiology"),
            ("urgency", "urgent"),
            ("clinical_notes", "Exertional chest pain, abnormal ECG with ST depression."),
        ],
        AgentKind::InsuranceAuthorization => vec![
            ("patient_name", "Jane Roe"),
            ("insurance_id", "XYZ-123"),
            ("requested_service", "Lumbar spine MRI"),
            ("urgency", "standard"),
            ("clinical_notes", "Radicular pain for 8 weeks despite physiotherapy and NSAIDs."),
        ],
        AgentKind::LabReport => vec![
            ("patient_name", "John Doe"),
            ("ordering_physician", "Dr. Patel"),
            ("collection_date", "2026-03-02"),
            ("lab_results", "Hb 9.1 g/dL (L), WBC 14.2 (H), Na 138, K 4.1"),
        ],
    }
}

/// A model reply that contains every section the agent asks for.
pub fn complete_reply(kind: AgentKind) -> String {
    let mut reply = format!("**{}**\n\n", kind.document_heading());
    for (i, heading) in kind.section_headings().iter().enumerate() {
        reply.push_str(&format!("## {}. {}\nDetails for this section.\n\n", i + 1, heading));
    }
    reply
}
