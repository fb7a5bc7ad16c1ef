//! Authentication service for API token validation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use crate::domain::repositories::TokenRepository;
use crate::error::AppError;
use serde_json::json;

type HmacSha256 = Hmac<Sha256>;

/// Authenticates owner requests via Bearer tokens.
///
/// Tokens are hashed with HMAC-SHA256 (keyed by `signing_secret`) before
/// storage and comparison. An attacker with read-only access to the token
/// store cannot verify or forge tokens without the server-side secret.
pub struct AuthService {
    tokens: Arc<dyn TokenRepository>,
    signing_secret: String,
    /// Hash of the bootstrap `API_TOKEN`, accepted alongside stored tokens.
    bootstrap_hash: Option<String>,
}

impl AuthService {
    pub fn new(tokens: Arc<dyn TokenRepository>, signing_secret: String) -> Self {
        Self {
            tokens,
            signing_secret,
            bootstrap_hash: None,
        }
    }

    /// Accepts `token` in addition to stored credentials. Lets a fresh
    /// deployment authenticate before the first token is minted.
    pub fn with_bootstrap_token(mut self, token: Option<&str>) -> Self {
        self.bootstrap_hash = token.map(|t| self.hash_token(t));
        self
    }

    /// Hashes a raw token with HMAC-SHA256 using the server signing secret.
    ///
    /// Returns a 64-character lowercase hex-encoded MAC. Public because the
    /// admin CLI mints tokens out of band and must produce the same hash.
    pub fn hash_token(&self, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Authenticates a raw token against stored credentials.
    ///
    /// On success, stamps `last_used_at` for audit purposes (best effort).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] for unknown or revoked tokens.
    pub async fn authenticate(&self, token: &str) -> Result<(), AppError> {
        let token_hash = self.hash_token(token);

        if self.bootstrap_hash.as_deref() == Some(token_hash.as_str()) {
            return Ok(());
        }

        let is_valid = self.tokens.validate_token(&token_hash).await?;

        if !is_valid {
            return Err(AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Invalid or revoked token"}),
            ));
        }

        let _ = self.tokens.update_last_used(&token_hash).await;

        Ok(())
    }
}
