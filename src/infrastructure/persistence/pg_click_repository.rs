//! PostgreSQL implementation of the click repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::retry;
use crate::domain::entities::{Click, NewClick};
use crate::domain::repositories::{ClickOutcome, ClickRepository};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct ClickRow {
    id: i64,
    link_id: i64,
    clicked_at: DateTime<Utc>,
    referer: Option<String>,
    user_agent: Option<String>,
    ip: Option<String>,
    country: Option<String>,
    device: Option<String>,
}

impl From<ClickRow> for Click {
    fn from(row: ClickRow) -> Self {
        Click {
            id: row.id,
            link_id: row.link_id,
            clicked_at: row.clicked_at,
            referer: row.referer,
            user_agent: row.user_agent,
            ip: row.ip,
            country: row.country,
            device: row.device,
        }
    }
}

/// Click repository backed by `links` and `link_clicks`.
///
/// Registration runs in a transaction: the conditional counter bump takes
/// the link's row lock, so concurrent registrations for one code serialize
/// and the ceiling can never be overshot. The event insert commits together
/// with the increment, keeping `click_count` and the stored events in step.
///
/// Only the read paths take the bounded backoff; a failed registration is
/// re-attempted by the retry worker, never in place.
pub struct PgClickRepository {
    pool: PgPool,
}

impl PgClickRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn register(&self, code: &str, click: NewClick) -> Result<ClickOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let bumped: Option<(i64, i64)> = sqlx::query_as(
            "UPDATE links SET \
                 click_count = click_count + 1, \
                 last_clicked_at = NOW() \
             WHERE code = $1 \
               AND (max_clicks IS NULL OR click_count < max_clicks) \
             RETURNING id, click_count",
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((link_id, click_count)) = bumped else {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM links WHERE code = $1")
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            return if exists.is_some() {
                Ok(ClickOutcome::LimitReached)
            } else {
                Err(AppError::not_found(
                    "Link not found",
                    serde_json::json!({ "code": code }),
                ))
            };
        };

        sqlx::query(
            "INSERT INTO link_clicks (link_id, referer, user_agent, ip, country, device) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(link_id)
        .bind(&click.referer)
        .bind(&click.user_agent)
        .bind(&click.ip)
        .bind(&click.country)
        .bind(&click.device)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ClickOutcome::Recorded { click_count })
    }

    async fn recent(&self, link_id: i64, limit: i64) -> Result<Vec<Click>, AppError> {
        let rows: Vec<ClickRow> = retry::read_with_backoff(|| {
            sqlx::query_as(
                "SELECT id, link_id, clicked_at, referer, user_agent, ip, country, device \
                 FROM link_clicks \
                 WHERE link_id = $1 \
                 ORDER BY clicked_at DESC, id DESC \
                 LIMIT $2",
            )
            .bind(link_id)
            .bind(limit)
            .fetch_all(&self.pool)
        })
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_for(&self, link_id: i64) -> Result<i64, AppError> {
        let count: i64 = retry::read_with_backoff(|| {
            sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks WHERE link_id = $1")
                .bind(link_id)
                .fetch_one(&self.pool)
        })
        .await?;

        Ok(count)
    }
}
