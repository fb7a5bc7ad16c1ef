//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A shortened URL record.
///
/// Maps a short code to a destination URL together with its lifecycle state
/// (activity flag, expiry, click ceiling) and optional access controls.
/// Serializable because the cache layer stores whole records as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub destination_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Ceiling on successful resolutions; `None` = unlimited.
    pub max_clicks: Option<i64>,
    /// Mutated only through click registration, never directly.
    pub click_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    /// Argon2id PHC string; presence means a credential is required to resolve.
    pub password_hash: Option<String>,
    pub is_active: bool,
    /// Country allow-list (ISO 3166-1 alpha-2, uppercase). `None` = everyone.
    pub allowed_countries: Option<Vec<String>>,
    /// Device-class allow-list (`desktop`, `mobile`, `tablet`). `None` = all.
    pub allowed_devices: Option<Vec<String>>,
    /// Opaque caller-owned annotations (title, campaign tags, AI suggestions).
    /// Stored and returned verbatim, never interpreted.
    pub metadata: Value,
}

impl Link {
    /// Returns true if the link has passed its expiry time as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the click ceiling has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_clicks.is_some_and(|max| self.click_count >= max)
    }

    /// Returns true if the record is eligible to produce a redirect at `now`,
    /// ignoring credentials and targeting.
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && !self.is_exhausted()
    }
}

/// Input data for creating a new link.
///
/// `code` has already passed allocation (validation or generation) by the
/// time this struct reaches the store; the store's insert is the atomic
/// reservation that makes the code binding final.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub code: String,
    pub destination_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub password_hash: Option<String>,
    pub allowed_countries: Option<Vec<String>>,
    pub allowed_devices: Option<Vec<String>>,
    pub metadata: Value,
}

/// Partial update for an existing link.
///
/// `None` fields are left unchanged.
/// `expires_at: Some(None)` clears the expiry; `Some(Some(t))` sets it.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub is_active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub metadata: Option<Value>,
}
