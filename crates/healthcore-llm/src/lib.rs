//! healthcore-llm — LLM client adapter and prompt construction.
//! Provides the LlmBackend trait with a Google Gemini implementation,
//! the per-agent prompt templates, structured entity extraction, and the
//! MedicalAssistant facade the web and ingestion layers call.

pub mod assistant;
pub mod audit;
pub mod backend;
pub mod entities;
pub mod prompts;

pub use assistant::{Generation, MedicalAssistant};
pub use audit::CallMetrics;
pub use backend::{GeminiBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use entities::MedicalEntities;
pub use prompts::{AgentInput, PromptError, PromptTemplate};
