//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use super::retry;
use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, code, destination_url, created_at, expires_at, max_clicks, \
     click_count, last_clicked_at, password_hash, is_active, allowed_countries, \
     allowed_devices, metadata";

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    code: String,
    destination_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    max_clicks: Option<i64>,
    click_count: i64,
    last_clicked_at: Option<DateTime<Utc>>,
    password_hash: Option<String>,
    is_active: bool,
    allowed_countries: Option<Vec<String>>,
    allowed_devices: Option<Vec<String>>,
    metadata: Value,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: row.id,
            code: row.code,
            destination_url: row.destination_url,
            created_at: row.created_at,
            expires_at: row.expires_at,
            max_clicks: row.max_clicks,
            click_count: row.click_count,
            last_clicked_at: row.last_clicked_at,
            password_hash: row.password_hash,
            is_active: row.is_active,
            allowed_countries: row.allowed_countries,
            allowed_devices: row.allowed_devices,
            metadata: row.metadata,
        }
    }
}

/// Link repository backed by the `links` table.
///
/// The unique index on `code` is the allocator's source of truth: `create`
/// is the atomic reservation, and a lost race surfaces as
/// [`AppError::Conflict`]. Transient connection failures get a bounded
/// number of re-attempts before they surface as `Unavailable`.
pub struct PgLinkRepository {
    pool: PgPool,
}

impl PgLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let sql = format!(
            "INSERT INTO links \
                 (code, destination_url, expires_at, max_clicks, password_hash, \
                  allowed_countries, allowed_devices, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {LINK_COLUMNS}"
        );

        let row: LinkRow = retry::write_with_backoff(|| {
            sqlx::query_as(&sql)
                .bind(&new_link.code)
                .bind(&new_link.destination_url)
                .bind(new_link.expires_at)
                .bind(new_link.max_clicks)
                .bind(&new_link.password_hash)
                .bind(&new_link.allowed_countries)
                .bind(&new_link.allowed_devices)
                .bind(&new_link.metadata)
                .fetch_one(&self.pool)
        })
        .await?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = $1");

        let row: Option<LinkRow> =
            retry::read_with_backoff(|| sqlx::query_as(&sql).bind(code).fetch_optional(&self.pool))
                .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");

        let row: Option<LinkRow> =
            retry::read_with_backoff(|| sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool))
                .await?;

        Ok(row.map(Into::into))
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        // `expires_at` distinguishes "leave as is" from "clear": a separate
        // boolean flag carries the presence of the outer Option.
        let sql = format!(
            "UPDATE links SET \
                 is_active  = COALESCE($2, is_active), \
                 expires_at = CASE WHEN $3 THEN $4 ELSE expires_at END, \
                 metadata   = COALESCE($5, metadata) \
             WHERE id = $1 \
             RETURNING {LINK_COLUMNS}"
        );

        let row: Option<LinkRow> = retry::write_with_backoff(|| {
            sqlx::query_as(&sql)
                .bind(id)
                .bind(patch.is_active)
                .bind(patch.expires_at.is_some())
                .bind(patch.expires_at.flatten())
                .bind(&patch.metadata)
                .fetch_optional(&self.pool)
        })
        .await?;

        row.map(Into::into)
            .ok_or_else(|| AppError::not_found("Link not found", serde_json::json!({ "id": id })))
    }

    async fn deactivate(&self, id: i64) -> Result<bool, AppError> {
        let result = retry::write_with_backoff(|| {
            sqlx::query("UPDATE links SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id)
                .execute(&self.pool)
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
