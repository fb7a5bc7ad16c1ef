//! Repository trait for short link storage.

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage interface for link records.
///
/// `create` is the atomic reservation boundary for short codes: exactly one
/// of any number of concurrent creators of the same code succeeds, the rest
/// receive a conflict. Lookups by code are the redirect hot path and must be
/// O(1) amortized (unique index / hash map in the implementations).
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] — PostgreSQL
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] — in-memory
/// - Mocks generated with mockall under `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new link, binding its code atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the code is already bound, and
    /// [`AppError::Unavailable`] / [`AppError::Internal`] on store failures.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Looks up a link by its short code. `Ok(None)` if unknown.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Looks up a link by its opaque id. `Ok(None)` if unknown.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Applies a partial mutation under per-record atomicity.
    ///
    /// Only fields present in [`LinkPatch`] change; concurrent patches and
    /// click increments never lose writes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this id.
    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError>;

    /// Soft-disables a link (`is_active = false`).
    ///
    /// Returns `Ok(false)` if the link does not exist or is already
    /// inactive. The code stays bound: codes are never reused.
    async fn deactivate(&self, id: i64) -> Result<bool, AppError>;
}
