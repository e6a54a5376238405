//! Per-call metrics recorded alongside every generated document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::backend::LlmResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMetrics {
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_sha256: String,
    pub latency_ms: u64,
    pub called_at: DateTime<Utc>,
}

impl CallMetrics {
    /// `output` is the text that will be stored; the digest is taken over it,
    /// not over the raw reply.
    pub fn from_response(backend: &str, response: &LlmResponse, output: &str, latency_ms: u64) -> Self {
        Self {
            model: response.model.clone(),
            backend: backend.to_string(),
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            output_sha256: sha256_hex(output),
            latency_ms,
            called_at: Utc::now(),
        }
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
