//! DTOs for the per-link statistics endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::services::LinkStats;
use crate::domain::entities::Click;

/// Query parameters for `GET /api/links/{id}/stats`.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// Size of the recent-events window (clamped server-side).
    pub limit: Option<i64>,
}

/// One click event as exposed by the API.
#[derive(Debug, Serialize)]
pub struct ClickDto {
    pub clicked_at: DateTime<Utc>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
}

impl From<Click> for ClickDto {
    fn from(click: Click) -> Self {
        Self {
            clicked_at: click.clicked_at,
            referer: click.referer,
            user_agent: click.user_agent,
            ip: click.ip,
            country: click.country,
            device: click.device,
        }
    }
}

/// Response body for `GET /api/links/{id}/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub id: i64,
    pub code: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub click_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Newest first.
    pub recent_clicks: Vec<ClickDto>,
}

impl From<LinkStats> for StatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            id: stats.id,
            code: stats.code,
            url: stats.destination_url,
            created_at: stats.created_at,
            expires_at: stats.expires_at,
            max_clicks: stats.max_clicks,
            click_count: stats.click_count,
            last_clicked_at: stats.last_clicked_at,
            is_active: stats.is_active,
            recent_clicks: stats.recent_clicks.into_iter().map(Into::into).collect(),
        }
    }
}
