//! healthcore-web: the HealthCore web application.
//!
//! Provides:
//!   - Four clinical document agents (form, LLM generation, HTML/PDF output)
//!   - Document upload with text extraction and summaries
//!   - Per-user audit log of every generation request
//!   - Session login backed by Argon2 password hashes

pub mod auth;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod render;
pub mod router;
pub mod state;

pub use error::{WebError, WebResult};
pub use router::build_router;
pub use state::{AppState, SharedState};
