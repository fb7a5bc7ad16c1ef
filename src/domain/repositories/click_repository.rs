//! Repository trait for click registration and retrieval.

use crate::domain::entities::{Click, NewClick};
use crate::error::AppError;
use async_trait::async_trait;

/// Outcome of an atomic click registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click was counted and stored; `click_count` is the post-increment
    /// value for this record.
    Recorded { click_count: i64 },
    /// The click ceiling was already reached; nothing was counted or stored.
    LimitReached,
}

/// Storage interface for click events.
///
/// [`register`](ClickRepository::register) carries the core guarantee:
/// the limit check, the counter increment, the event append, and the
/// `last_clicked_at` update happen as one atomic step per record. Under
/// concurrency exactly one caller becomes "the click that reaches the
/// limit"; later callers observe [`ClickOutcome::LimitReached`] and leave no
/// trace. An observer can therefore never see a `click_count` of N with
/// fewer than N stored events, or vice versa.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Atomically counts and stores one click for the link with this code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is unknown, and
    /// [`AppError::Unavailable`] / [`AppError::Internal`] on store failures
    /// (in which case nothing was counted — the step is all-or-nothing).
    async fn register(&self, code: &str, click: NewClick) -> Result<ClickOutcome, AppError>;

    /// Most recent events for a link, newest first, at most `limit`.
    async fn recent(&self, link_id: i64, limit: i64) -> Result<Vec<Click>, AppError>;

    /// Total stored events for a link.
    async fn count_for(&self, link_id: i64) -> Result<i64, AppError>;
}
