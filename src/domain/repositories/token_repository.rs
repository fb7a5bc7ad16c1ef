//! Repository trait for API token storage.

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A stored API token. Only the HMAC-SHA256 hash of the raw token is
/// persisted; the raw value is shown once at creation time.
#[derive(Debug, Clone)]
pub struct ApiToken {
    pub id: i64,
    pub name: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Storage interface for API tokens used by the owner-only endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Returns true if a non-revoked token with this hash exists.
    async fn validate_token(&self, token_hash: &str) -> Result<bool, AppError>;

    /// Stamps `last_used_at` for audit purposes. Best effort.
    async fn update_last_used(&self, token_hash: &str) -> Result<(), AppError>;

    /// Stores a new token hash under a human-readable name.
    async fn create_token(&self, name: &str, token_hash: &str) -> Result<ApiToken, AppError>;

    /// All tokens, newest first.
    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError>;

    /// Finds a token by its name. `Ok(None)` if unknown.
    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError>;

    /// Marks a token revoked. Idempotent.
    async fn revoke_token(&self, id: i64) -> Result<(), AppError>;
}
