//! Link creation and management service.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::password;
use crate::utils::url_normalizer::normalize_url;

/// Candidate codes drawn before giving up on the current code length.
///
/// Exhaustion means the keyspace at this length is saturated; the fix is a
/// longer `CODE_LENGTH`, not more retries.
const MAX_ALLOCATION_ATTEMPTS: usize = 5;

/// Validated input for creating a link.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub destination_url: String,
    pub custom_code: Option<String>,
    /// Minutes until expiry; `None` = never expires (unless the service is
    /// configured to require one).
    pub validity_minutes: Option<i64>,
    pub max_clicks: Option<i64>,
    /// Plaintext password; hashed before it reaches the store.
    pub password: Option<String>,
    pub allowed_countries: Option<Vec<String>>,
    pub allowed_devices: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// Service for creating and mutating shortened links.
///
/// Owns code allocation: custom codes are validated and reserved, generated
/// codes are drawn from the configured alphabet with bounded collision
/// retry. The store's `create` is the atomic reservation in both paths.
pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    code_length: usize,
    require_expiry: bool,
}

impl LinkService {
    pub fn new(links: Arc<dyn LinkRepository>, code_length: usize, require_expiry: bool) -> Self {
        Self {
            links,
            code_length,
            require_expiry,
        }
    }

    /// Creates a short link.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`]: invalid URL, invalid custom code,
    ///   non-positive `validity_minutes` or `max_clicks`, missing expiry
    ///   when the service requires one
    /// - [`AppError::Conflict`]: custom code already bound
    /// - [`AppError::Unavailable`]: generated-code space saturated
    pub async fn create_link(&self, input: CreateLink) -> Result<Link, AppError> {
        let destination_url = normalize_url(&input.destination_url).map_err(|e| {
            AppError::validation("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let now = Utc::now();
        let expires_at = self.expiry_from_validity(now, input.validity_minutes)?;

        if let Some(max) = input.max_clicks
            && max <= 0
        {
            return Err(AppError::validation(
                "max_clicks must be a positive integer",
                json!({ "max_clicks": max }),
            ));
        }

        let password_hash = password::hash_if_present(input.password.as_deref())?;

        let new_link = NewLink {
            code: String::new(), // filled per attempt below
            destination_url,
            expires_at,
            max_clicks: input.max_clicks,
            password_hash,
            allowed_countries: normalize_list(input.allowed_countries, str::to_ascii_uppercase),
            allowed_devices: normalize_list(input.allowed_devices, str::to_ascii_lowercase),
            metadata: input.metadata.unwrap_or_else(|| json!({})),
        };

        match input.custom_code {
            Some(custom) => self.create_with_custom_code(new_link, custom).await,
            None => self.create_with_generated_code(new_link).await,
        }
    }

    async fn create_with_custom_code(
        &self,
        mut new_link: NewLink,
        custom: String,
    ) -> Result<Link, AppError> {
        validate_custom_code(&custom)?;

        if self.links.find_by_code(&custom).await?.is_some() {
            return Err(AppError::conflict(
                "Custom code already exists",
                json!({ "code": custom }),
            ));
        }

        new_link.code = custom;
        // A racing creator may still win between the check and the insert;
        // the store's conflict is authoritative either way.
        self.links.create(new_link).await
    }

    async fn create_with_generated_code(&self, mut new_link: NewLink) -> Result<Link, AppError> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let candidate = generate_code(self.code_length);

            if self.links.find_by_code(&candidate).await?.is_some() {
                continue;
            }

            new_link.code = candidate;
            match self.links.create(new_link.clone()).await {
                Ok(link) => return Ok(link),
                // Lost the reservation race; draw a fresh candidate.
                Err(AppError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::unavailable(
            "Short code space saturated at the configured length",
            json!({ "code_length": self.code_length, "attempts": MAX_ALLOCATION_ATTEMPTS }),
        ))
    }

    fn expiry_from_validity(
        &self,
        now: DateTime<Utc>,
        validity_minutes: Option<i64>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match validity_minutes {
            Some(m) if m <= 0 => Err(AppError::validation(
                "validity_minutes must be a positive integer",
                json!({ "validity_minutes": m }),
            )),
            Some(m) => Ok(Some(now + Duration::minutes(m))),
            None if self.require_expiry => Err(AppError::validation(
                "validity_minutes is required by this deployment",
                json!({}),
            )),
            None => Ok(None),
        }
    }

    /// Retrieves a link by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    pub async fn get_link(&self, id: i64) -> Result<Link, AppError> {
        self.links
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    /// Applies an owner mutation: activity toggle, expiry change, metadata
    /// replacement.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if a new expiry is not in the
    /// future, [`AppError::NotFound`] if the id is unknown.
    pub async fn update_link(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        if let Some(Some(expires_at)) = patch.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::validation(
                "expires_at must be in the future",
                json!({ "expires_at": expires_at }),
            ));
        }

        self.links.update(id, patch).await
    }

    /// Soft-disables a link. The code stays bound forever: codes are never
    /// reused, so previously shared URLs can never point elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the id is unknown or the link is
    /// already inactive.
    pub async fn deactivate_link(&self, id: i64) -> Result<(), AppError> {
        if self.links.deactivate(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(
                "Link not found or already inactive",
                json!({ "id": id }),
            ))
        }
    }
}

fn normalize_list(
    list: Option<Vec<String>>,
    f: impl Fn(&str) -> String,
) -> Option<Vec<String>> {
    list.map(|items| items.iter().map(|s| f(s.trim())).collect())
}
