//! LLM backend trait and the Google Gemini implementation.
//!
//! The trait is the seam the rest of the workspace depends on; tests plug in
//! scripted backends, production uses `GeminiBackend` against the
//! `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use healthcore_config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::PromptError;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Model returned no content: {reason}")]
    EmptyResponse { reason: String },
    #[error("GOOGLE_API_KEY environment variable is missing")]
    MissingApiKey,
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn backend_name(&self) -> &str;
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: Option<serde_json::Value> = serde_json::from_str(&text).ok();

    if status >= 400 {
        let msg = body
            .as_ref()
            .and_then(|b| b["error"]["message"].as_str().or_else(|| b["message"].as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| healthcore_common::truncate_chars(&text, 200).to_string());
        return Err(LlmError::ApiError { status, message: msg });
    }

    match body {
        Some(json) => Ok(json),
        None => Ok(serde_json::from_str(&text)?),
    }
}

// ── Google Gemini ─────────────────────────────────────────────────────────────

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    pub model: String,
    pub base_url: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    timeout: Duration,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: GEMINI_DEFAULT_BASE_URL.to_string(),
            default_temperature: 0.3,
            default_max_tokens: 2048,
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    /// Build from configuration; fails when no API key was provided.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = config.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
        let mut backend = Self::new(SecretString::from(key.expose_secret()), &config.model)
            .with_base_url(&config.base_url)
            .with_timeout(Duration::from_secs(config.request_timeout_secs))?;
        backend.default_temperature = config.temperature;
        backend.default_max_tokens = config.max_output_tokens;
        Ok(backend)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        self.timeout = timeout;
        Ok(self)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(&self, req: &LlmRequest) -> serde_json::Value {
        // System message → systemInstruction
        let system_text: Vec<&str> = req.messages.iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": req.max_tokens.unwrap_or(self.default_max_tokens),
                "temperature":     req.temperature.unwrap_or(self.default_temperature),
            }
        });
        if !system_text.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system_text.join("\n\n") }]
            });
        }
        body
    }
}

/// Extract the generated text and token usage from a `generateContent` reply.
pub fn parse_gemini_response(json: &serde_json::Value, model: &str) -> Result<LlmResponse, LlmError> {
    let Some(candidate) = json["candidates"].as_array().and_then(|c| c.first()) else {
        let reason = json["promptFeedback"]["blockReason"]
            .as_str()
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::EmptyResponse { reason });
    };

    let content: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        let reason = candidate["finishReason"]
            .as_str()
            .map(|r| format!("finish reason {r}"))
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(LlmError::EmptyResponse { reason });
    }

    Ok(LlmResponse {
        content,
        model: json["modelVersion"].as_str().unwrap_or(model).to_string(),
        prompt_tokens: json["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
    })
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let body = self.build_body(&req);

        let resp = self.client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout(self.timeout) } else { LlmError::Http(e) })?;

        let json = check_response_status(resp).await?;
        parse_gemini_response(&json, model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "gemini" }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
