//! healthcore-common — Shared types, errors, and helpers used across all HealthCore crates.

pub mod agent;
pub mod error;
pub mod text;

// Re-export commonly used types
pub use agent::{AgentKind, DocumentType, ParseKindError};
pub use error::{HealthcoreError, Result};
pub use text::truncate_chars;
