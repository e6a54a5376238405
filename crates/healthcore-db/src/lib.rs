//! HealthCore Database Layer
//!
//! SQLite persistence for users, sessions, uploaded documents, their
//! summaries, and the audit trail of LLM generations.
//!
//! # Example
//!
//! ```rust,no_run
//! use healthcore_db::{Database, UserRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://healthcore.db?mode=rwc", 5).await?;
//!     db.migrate().await?;
//!
//!     let users = UserRepository::new(Arc::new(db));
//!     println!("{} users", users.count().await?);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod database;
pub mod documents;
pub mod error;
pub mod schema;
pub mod sessions;
pub mod summaries;
pub mod users;

pub use audit::AuditRepository;
pub use database::{Database, DatabaseStats};
pub use documents::DocumentRepository;
pub use error::{DbError, Result};
pub use schema::{
    AuditRecord, AuditStatus, Document, DocumentStatus, NewAuditRecord, NewDocument, NewSummary,
    Session, Summary, User,
};
pub use sessions::SessionRepository;
pub use summaries::SummaryRepository;
pub use users::UserRepository;
