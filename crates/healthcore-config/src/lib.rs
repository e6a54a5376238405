//! Configuration loading for HealthCore.
//! Reads healthcore.toml from the current directory or path in HEALTHCORE_CONFIG env var,
//! then applies environment overrides (a `.env` file is honoured).

use healthcore_common::{HealthcoreError, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::Path;

pub const ENV_CONFIG_PATH: &str = "HEALTHCORE_CONFIG";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_SECRET_KEY: &str = "HEALTHCORE_SECRET_KEY";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND: &str = "HEALTHCORE_BIND";
pub const ENV_MEDIA_ROOT: &str = "HEALTHCORE_MEDIA_ROOT";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url()    -> String { "sqlite://healthcore.db?mode=rwc".to_string() }
fn default_max_connections() -> u32    { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url(), max_connections: default_max_connections() }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
}

fn default_model()             -> String { "gemini-2.0-flash".to_string() }
fn default_temperature()       -> f32    { 0.3 }
fn default_max_output_tokens() -> u32    { 2048 }
fn default_request_timeout()   -> u64    { 60 }
fn default_llm_base_url()      -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout(),
            base_url: default_llm_base_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_media_root")]
    pub media_root: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_media_root()       -> String { "./media".to_string() }
fn default_max_upload_bytes() -> usize  { 10 * 1024 * 1024 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { media_root: default_media_root(), max_upload_bytes: default_max_upload_bytes() }
    }
}

#[derive(Debug, Deserialize)]
pub struct SecurityConfig {
    /// HMAC key for session rows; the server refuses to start without one.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub secret_key: Option<SecretString>,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: u32,
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_session_ttl() -> u32 { 24 * 14 }

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { secret_key: None, session_ttl_hours: default_session_ttl(), secure_cookies: false }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}


impl Config {
    /// Load configuration: `.env`, then the TOML file (optional), then env overrides.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| "healthcore.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            tracing::info!(path = %path, "Configuration file loaded");
            Self::from_toml_str(&content)?
        } else {
            tracing::info!(path = %path, "No configuration file found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_GOOGLE_API_KEY) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = non_empty(ENV_SECRET_KEY) {
            self.security.secret_key = Some(SecretString::from(key));
        }
        if let Some(url) = non_empty(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Some(bind) = non_empty(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(root) = non_empty(ENV_MEDIA_ROOT) {
            self.storage.media_root = root;
        }
    }

    /// Checks required before the web server starts.
    pub fn validate_for_serving(&self) -> Result<()> {
        if self.security.secret_key.is_none() {
            return Err(HealthcoreError::Config(format!(
                "{ENV_SECRET_KEY} is not set; refusing to serve without a secret key"
            )));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(HealthcoreError::Config(
                "storage.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.security.session_ttl_hours) * 3600)
    }
}
