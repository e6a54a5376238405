//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Duration;

use healthcore_config::Config;
use healthcore_db::{
    AuditRepository, Database, DocumentRepository, SessionRepository, SummaryRepository,
    UserRepository,
};
use healthcore_ingestion::{DocumentProcessingService, UploadStore};
use healthcore_llm::MedicalAssistant;
use minijinja::Environment;

use crate::auth::SessionKey;
use crate::error::{WebError, WebResult};
use crate::render::templates;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub users: UserRepository,
    pub sessions: SessionRepository,
    pub session_key: SessionKey,
    pub documents: DocumentRepository,
    pub summaries: SummaryRepository,
    pub audit: AuditRepository,
    pub assistant: MedicalAssistant,
    pub processor: DocumentProcessingService,
    pub store: UploadStore,
    pub templates: Environment<'static>,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Arc<Database>, assistant: MedicalAssistant, config: Config) -> WebResult<Self> {
        let secret = config.security.secret_key.as_ref().ok_or_else(|| {
            WebError::Internal("no secret key configured for session signing".to_string())
        })?;
        let session_key = SessionKey::new(secret)?;
        let store = UploadStore::new(&config.storage.media_root);
        Ok(Self {
            users: UserRepository::new(db.clone()),
            sessions: SessionRepository::new(db.clone()),
            session_key,
            documents: DocumentRepository::new(db.clone()),
            summaries: SummaryRepository::new(db.clone()),
            audit: AuditRepository::new(db.clone()),
            processor: DocumentProcessingService::new(db.clone(), assistant.clone(), store.clone()),
            assistant,
            store,
            templates: templates::environment()?,
            config,
            db,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        self.config.session_ttl()
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.security.secure_cookies
    }

    /// Render an embedded template by name.
    pub fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, minijinja::Error> {
        self.templates.get_template(name)?.render(ctx)
    }
}

pub type SharedState = Arc<AppState>;
