//! `MedicalAssistant` — the facade the web and ingestion layers call.
//!
//! Builds the prompt, sends one request through the configured backend and
//! returns the trimmed output together with call metrics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use healthcore_common::{truncate_chars, AgentKind, DocumentType};
use healthcore_config::LlmConfig;
use tracing::{debug, info, warn};

use crate::audit::CallMetrics;
use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};
use crate::entities::{self, MedicalEntities};
use crate::prompts::{self, AgentInput, MAX_ENTITY_SOURCE_CHARS};

#[derive(Debug, Clone)]
pub struct Generation {
    pub output: String,
    pub prompt: String,
    pub metrics: CallMetrics,
}

#[derive(Clone)]
pub struct MedicalAssistant {
    backend: Arc<dyn LlmBackend>,
    temperature: f32,
    max_output_tokens: u32,
}

impl MedicalAssistant {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            backend,
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
        }
    }

    pub fn with_config(backend: Arc<dyn LlmBackend>, config: &LlmConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    pub async fn generate_agent_document(
        &self,
        kind: AgentKind,
        input: &AgentInput,
    ) -> Result<Generation, LlmError> {
        let prompt = prompts::build_agent_prompt(kind, input)?;
        debug!(agent = %kind, prompt_chars = prompt.chars().count(), "Built agent prompt");
        self.run(prompt).await
    }

    /// Summarise extracted document text; typed documents use their agent's template.
    pub async fn generate_summary(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> Result<Generation, LlmError> {
        let label = match doc_type {
            DocumentType::General => "medical",
            other => other.label(),
        };
        let prompt = prompts::build_document_prompt(doc_type.agent(), label, text)?;
        self.run(prompt).await
    }

    /// Never fails: on any error the placeholder entities are returned.
    pub async fn extract_entities(&self, text: &str) -> MedicalEntities {
        match self.try_extract_entities(text).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(error = %e, "Entity extraction failed, storing placeholder");
                MedicalEntities::not_extracted()
            }
        }
    }

    async fn try_extract_entities(&self, text: &str) -> Result<MedicalEntities, String> {
        let values = BTreeMap::from([
            ("format_instructions", entities::format_instructions()),
            ("text", truncate_chars(text, MAX_ENTITY_SOURCE_CHARS).to_string()),
        ]);
        let prompt = prompts::ENTITY_EXTRACTION.render(&values).map_err(|e| e.to_string())?;
        let generation = self.run(prompt).await.map_err(|e| e.to_string())?;
        entities::parse_entities(&generation.output).map_err(|e| e.to_string())
    }

    async fn run(&self, prompt: String) -> Result<Generation, LlmError> {
        let req = LlmRequest {
            messages: vec![Message::user(prompt.clone())],
            model: None,
            max_tokens: Some(self.max_output_tokens),
            temperature: Some(self.temperature),
        };

        let started = Instant::now();
        let response = self.backend.complete(req).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let output = response.content.trim().to_string();
        let metrics = CallMetrics::from_response(self.backend.backend_name(), &response, &output, latency_ms);
        info!(
            backend = %metrics.backend,
            model = %metrics.model,
            prompt_tokens = metrics.prompt_tokens,
            completion_tokens = metrics.completion_tokens,
            latency_ms,
            "LLM call completed"
        );

        Ok(Generation {
            output,
            prompt,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies and records every request it sees.
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(req);
            let reply = self.replies.lock().unwrap().remove(0)?;
            Ok(LlmResponse {
                content: reply,
                model: "scripted-1".to_string(),
                prompt_tokens: 11,
                completion_tokens: 7,
            })
        }
        fn model_id(&self) -> &str { "scripted-1" }
        fn backend_name(&self) -> &str { "scripted" }
    }

    fn input() -> AgentInput {
        AgentInput {
            context: vec![("Patient name".to_string(), "Jane Roe".to_string())],
            notes: "Admitted with pneumonia, treated with IV antibiotics.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_agent_document_trims_output_and_records_metrics() {
        let backend = ScriptedBackend::new(vec![Ok("  **DISCHARGE SUMMARY**\n\n".to_string())]);
        let assistant = MedicalAssistant::new(backend.clone());

        let gen = assistant.generate_agent_document(AgentKind::DischargeSummary, &input()).await.unwrap();
        assert_eq!(gen.output, "**DISCHARGE SUMMARY**");
        assert!(gen.prompt.contains("Jane Roe"));
        assert_eq!(gen.metrics.backend, "scripted");
        assert_eq!(gen.metrics.prompt_tokens, 11);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].role, "user");
        assert_eq!(seen[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = ScriptedBackend::new(vec![Err(LlmError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        })]);
        let assistant = MedicalAssistant::new(backend);
        let err = assistant.generate_agent_document(AgentKind::LabReport, &input()).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_general_summary_uses_general_template() {
        let backend = ScriptedBackend::new(vec![Ok("Summary".to_string())]);
        let assistant = MedicalAssistant::new(backend.clone());
        assistant.generate_summary("BP 150/90", DocumentType::General).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].messages[0].content.contains("summary of this medical document"));
    }

    #[tokio::test]
    async fn test_typed_summary_uses_agent_template() {
        let backend = ScriptedBackend::new(vec![Ok("Summary".to_string())]);
        let assistant = MedicalAssistant::new(backend.clone());
        assistant.generate_summary("WBC 14.2", DocumentType::LabReport).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].messages[0].content.contains("LABORATORY REPORT SUMMARY"));
    }

    #[tokio::test]
    async fn test_entity_extraction_falls_back() {
        let backend = ScriptedBackend::new(vec![Ok("not json at all".to_string())]);
        let assistant = MedicalAssistant::new(backend);
        assert_eq!(assistant.extract_entities("text").await, MedicalEntities::not_extracted());
    }

    #[tokio::test]
    async fn test_entity_extraction_parses_reply() {
        let reply = r#"```json
{"patient_info": "A", "chief_complaint": "B", "symptoms": "C", "diagnosis": "D",
 "medications": "E", "treatment_plan": "F", "vitals": "G"}
```"#;
        let backend = ScriptedBackend::new(vec![Ok(reply.to_string())]);
        let assistant = MedicalAssistant::new(backend);
        let entities = assistant.extract_entities("text").await;
        assert_eq!(entities.diagnosis, "D");
    }
}
