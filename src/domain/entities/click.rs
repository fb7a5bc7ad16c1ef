//! Click event entity for per-link analytics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored click event.
///
/// Back-references its link by id. All hint fields are opaque strings
/// supplied by the caller (or derived from request headers) and are used for
/// reporting only; policy decisions never read them back.
#[derive(Debug, Clone, Serialize)]
pub struct Click {
    pub id: i64,
    pub link_id: i64,
    pub clicked_at: DateTime<Utc>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
}

/// Input data for appending a click event.
///
/// Appended together with the counter increment in one atomic store step, so
/// the stored event count and `click_count` can never drift apart.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
}

impl NewClick {
    /// An event with no client hints, for callers that have none.
    pub fn empty() -> Self {
        Self {
            referer: None,
            user_agent: None,
            ip: None,
            country: None,
            device: None,
        }
    }
}
