//! Login sessions.
//!
//! Rows are keyed by a digest of the cookie token; the raw token never
//! reaches the database. Expiry is checked on every lookup.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{Session, User};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: i64, token_hash: &str, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(14));
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?) \
             RETURNING token_hash, user_id, created_at, expires_at",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(self.db.pool())
        .await?;
        Ok(session)
    }

    /// The session's user, if the digest exists and has not expired.
    pub async fn find_user(&self, token_hash: &str) -> Result<Option<User>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(session) = session else { return Ok(None) };
        if session.is_expired(Utc::now()) {
            tracing::debug!(user_id = session.user_id, "Session expired");
            return Ok(None);
        }

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_staff, created_at FROM users WHERE id = ?",
        )
        .bind(session.user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    pub async fn delete(&self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Remove expired sessions; returns how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions",
        )
        .fetch_all(self.db.pool())
        .await?;

        let now = Utc::now();
        let mut purged = 0;
        for session in sessions.iter().filter(|s| s.is_expired(now)) {
            self.delete(&session.token_hash).await?;
            purged += 1;
        }
        if purged > 0 {
            tracing::info!(purged, "Expired sessions removed");
        }
        Ok(purged)
    }
}
