//! Per-link statistics service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::entities::Click;
use crate::domain::repositories::{ClickRepository, LinkRepository};
use crate::error::AppError;

/// Default and maximum size of the recent-events window.
const DEFAULT_RECENT_LIMIT: i64 = 50;
const MAX_RECENT_LIMIT: i64 = 500;

/// Statistics snapshot for one link.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub id: i64,
    pub code: String,
    pub destination_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub click_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Newest first.
    pub recent_clicks: Vec<Click>,
}

/// Read-side service joining link state with its click history.
pub struct StatsService {
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
}

impl StatsService {
    pub fn new(links: Arc<dyn LinkRepository>, clicks: Arc<dyn ClickRepository>) -> Self {
        Self { links, clicks }
    }

    /// Statistics for the link with this id.
    ///
    /// `limit` caps the recent-events window; `None` uses the default.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown id.
    pub async fn stats_for(&self, id: i64, limit: Option<i64>) -> Result<LinkStats, AppError> {
        let link = self
            .links
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        let recent_clicks = self.clicks.recent(link.id, limit).await?;

        Ok(LinkStats {
            id: link.id,
            code: link.code,
            destination_url: link.destination_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            max_clicks: link.max_clicks,
            click_count: link.click_count,
            last_clicked_at: link.last_clicked_at,
            is_active: link.is_active,
            recent_clicks,
        })
    }
}
