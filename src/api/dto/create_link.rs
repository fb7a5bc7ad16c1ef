//! DTOs for the link creation endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::Link;

/// Compiled regex for custom code validation.
static CUSTOM_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Request body for `POST /api/links`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Destination to redirect to (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Optional caller-chosen short code.
    #[validate(length(min = 1, max = 20))]
    #[validate(regex(path = "*CUSTOM_CODE_REGEX"))]
    pub custom_code: Option<String>,

    /// Minutes until expiry; omit for a link that never expires.
    #[validate(range(min = 1))]
    pub validity_minutes: Option<i64>,

    /// Ceiling on successful resolutions; omit for unlimited.
    #[validate(range(min = 1))]
    pub max_clicks: Option<i64>,

    /// Plaintext password; stored only as an Argon2 hash.
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,

    /// Country allow-list (ISO 3166-1 alpha-2).
    pub allowed_countries: Option<Vec<String>>,

    /// Device-class allow-list (`desktop`, `mobile`, `tablet`).
    pub allowed_devices: Option<Vec<String>>,

    /// Opaque annotations stored and returned verbatim.
    pub metadata: Option<Value>,
}

/// A link as exposed by the API. The password hash never leaves the server;
/// callers only learn whether a password is set.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub code: String,
    pub short_url: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub click_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub has_password: bool,
    pub allowed_countries: Option<Vec<String>>,
    pub allowed_devices: Option<Vec<String>>,
    pub metadata: Value,
}

impl LinkResponse {
    pub fn from_link(link: Link, short_url: String) -> Self {
        Self {
            id: link.id,
            code: link.code,
            short_url,
            url: link.destination_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            max_clicks: link.max_clicks,
            click_count: link.click_count,
            last_clicked_at: link.last_clicked_at,
            is_active: link.is_active,
            has_password: link.password_hash.is_some(),
            allowed_countries: link.allowed_countries,
            allowed_devices: link.allowed_devices,
            metadata: link.metadata,
        }
    }
}
