//! In-memory storage backend.
//!
//! Used for tests and for `STORAGE_BACKEND=memory` deployments where
//! durability does not matter. Concurrency mirrors the database backend:
//! code reservation is atomic under the index write lock, and click
//! registration takes a per-record lock so the counter and the stored
//! events move together while unrelated records stay uncontended.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;

use crate::domain::entities::{Click, Link, LinkPatch, NewClick, NewLink};
use crate::domain::repositories::{
    ApiToken, ClickOutcome, ClickRepository, LinkRepository, TokenRepository,
};
use crate::error::AppError;

/// One record cell: the link plus its click history, guarded together.
struct Record {
    link: Link,
    clicks: Vec<Click>,
}

type Cell = Arc<RwLock<Record>>;

#[derive(Default)]
struct Index {
    by_code: HashMap<String, Cell>,
    by_id: HashMap<i64, Cell>,
}

/// Shared in-memory store behind the memory repositories.
#[derive(Default)]
pub struct MemoryStore {
    index: RwLock<Index>,
    next_link_id: AtomicI64,
    next_click_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn cell_by_code(&self, code: &str) -> Option<Cell> {
        self.index.read().await.by_code.get(code).cloned()
    }

    async fn cell_by_id(&self, id: i64) -> Option<Cell> {
        self.index.read().await.by_id.get(&id).cloned()
    }
}

/// Link repository over a [`MemoryStore`].
pub struct MemoryLinkRepository {
    store: Arc<MemoryStore>,
}

impl MemoryLinkRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut index = self.store.index.write().await;

        // Insert under the index write lock: the reservation either fully
        // happens or conflicts, same as the database's unique index.
        if index.by_code.contains_key(&new_link.code) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "code": new_link.code }),
            ));
        }

        let id = self.store.next_link_id.fetch_add(1, Ordering::Relaxed) + 1;
        let link = Link {
            id,
            code: new_link.code.clone(),
            destination_url: new_link.destination_url,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            max_clicks: new_link.max_clicks,
            click_count: 0,
            last_clicked_at: None,
            password_hash: new_link.password_hash,
            is_active: true,
            allowed_countries: new_link.allowed_countries,
            allowed_devices: new_link.allowed_devices,
            metadata: new_link.metadata,
        };

        let cell = Arc::new(RwLock::new(Record {
            link: link.clone(),
            clicks: Vec::new(),
        }));
        index.by_code.insert(new_link.code, Arc::clone(&cell));
        index.by_id.insert(id, cell);

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        match self.store.cell_by_code(code).await {
            Some(cell) => Ok(Some(cell.read().await.link.clone())),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        match self.store.cell_by_id(id).await {
            Some(cell) => Ok(Some(cell.read().await.link.clone())),
            None => Ok(None),
        }
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let cell = self
            .store
            .cell_by_id(id)
            .await
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        let mut record = cell.write().await;
        if let Some(is_active) = patch.is_active {
            record.link.is_active = is_active;
        }
        if let Some(expires_at) = patch.expires_at {
            record.link.expires_at = expires_at;
        }
        if let Some(metadata) = patch.metadata {
            record.link.metadata = metadata;
        }

        Ok(record.link.clone())
    }

    async fn deactivate(&self, id: i64) -> Result<bool, AppError> {
        let Some(cell) = self.store.cell_by_id(id).await else {
            return Ok(false);
        };

        let mut record = cell.write().await;
        if !record.link.is_active {
            return Ok(false);
        }
        record.link.is_active = false;
        Ok(true)
    }
}

/// Click repository over a [`MemoryStore`].
pub struct MemoryClickRepository {
    store: Arc<MemoryStore>,
}

impl MemoryClickRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ClickRepository for MemoryClickRepository {
    async fn register(&self, code: &str, click: NewClick) -> Result<ClickOutcome, AppError> {
        let cell = self
            .store
            .cell_by_code(code)
            .await
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "code": code })))?;

        // The record write lock makes the limit check, the increment and the
        // event append one step; concurrent callers serialize here.
        let mut record = cell.write().await;

        if record.link.is_exhausted() {
            return Ok(ClickOutcome::LimitReached);
        }

        let now = Utc::now();
        record.link.click_count += 1;
        record.link.last_clicked_at = Some(now);

        let id = self.store.next_click_id.fetch_add(1, Ordering::Relaxed) + 1;
        let link_id = record.link.id;
        record.clicks.push(Click {
            id,
            link_id,
            clicked_at: now,
            referer: click.referer,
            user_agent: click.user_agent,
            ip: click.ip,
            country: click.country,
            device: click.device,
        });

        Ok(ClickOutcome::Recorded {
            click_count: record.link.click_count,
        })
    }

    async fn recent(&self, link_id: i64, limit: i64) -> Result<Vec<Click>, AppError> {
        let Some(cell) = self.store.cell_by_id(link_id).await else {
            return Ok(Vec::new());
        };

        let record = cell.read().await;
        Ok(record
            .clicks
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_for(&self, link_id: i64) -> Result<i64, AppError> {
        let Some(cell) = self.store.cell_by_id(link_id).await else {
            return Ok(0);
        };

        Ok(cell.read().await.clicks.len() as i64)
    }
}

/// Token repository over a plain in-memory list.
#[derive(Default)]
pub struct MemoryTokenRepository {
    tokens: RwLock<Vec<ApiToken>>,
    next_id: AtomicI64,
}

impl MemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a token hash directly, for the bootstrap `API_TOKEN` setting
    /// and for tests.
    pub async fn seed(&self, name: &str, token_hash: &str) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.tokens.write().await.push(ApiToken {
            id,
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
            revoked_at: None,
        });
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn validate_token(&self, token_hash: &str) -> Result<bool, AppError> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .any(|t| t.token_hash == token_hash && t.revoked_at.is_none()))
    }

    async fn update_last_used(&self, _token_hash: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_token(&self, name: &str, token_hash: &str) -> Result<ApiToken, AppError> {
        let mut tokens = self.tokens.write().await;
        if tokens.iter().any(|t| t.name == name) {
            return Err(AppError::conflict(
                "Token name already exists",
                json!({ "name": name }),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = ApiToken {
            id,
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
            revoked_at: None,
        };
        tokens.push(token.clone());
        Ok(token)
    }

    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError> {
        let mut tokens = self.tokens.read().await.clone();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn revoke_token(&self, id: i64) -> Result<(), AppError> {
        let mut tokens = self.tokens.write().await;
        if let Some(token) = tokens.iter_mut().find(|t| t.id == id)
            && token.revoked_at.is_none()
        {
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_link(code: &str) -> NewLink {
        NewLink {
            code: code.to_string(),
            destination_url: "https://example.com/".to_string(),
            expires_at: None,
            max_clicks: None,
            password_hash: None,
            allowed_countries: None,
            allowed_devices: None,
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));

        let created = links.create(new_link("abc123")).await.unwrap();
        assert_eq!(created.click_count, 0);
        assert!(created.is_active);

        let by_code = links.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);

        let by_id = links.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "abc123");

        assert!(links.find_by_code("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));

        links.create(new_link("dup")).await.unwrap();
        let err = links.create(new_link("dup")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_register_increments_and_appends_together() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));
        let clicks = MemoryClickRepository::new(Arc::clone(&store));

        let link = links.create(new_link("clicky")).await.unwrap();

        let outcome = clicks.register("clicky", NewClick::empty()).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Recorded { click_count: 1 });

        let reloaded = links.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(reloaded.click_count, 1);
        assert!(reloaded.last_clicked_at.is_some());
        assert_eq!(clicks.count_for(link.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_stops_at_ceiling() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));
        let clicks = MemoryClickRepository::new(Arc::clone(&store));

        let mut nl = new_link("limited");
        nl.max_clicks = Some(2);
        let link = links.create(nl).await.unwrap();

        for expected in 1..=2 {
            let outcome = clicks.register("limited", NewClick::empty()).await.unwrap();
            assert_eq!(
                outcome,
                ClickOutcome::Recorded {
                    click_count: expected
                }
            );
        }

        let outcome = clicks.register("limited", NewClick::empty()).await.unwrap();
        assert_eq!(outcome, ClickOutcome::LimitReached);

        // Nothing counted or stored past the ceiling.
        let reloaded = links.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(reloaded.click_count, 2);
        assert_eq!(clicks.count_for(link.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_register_unknown_code() {
        let store = MemoryStore::new();
        let clicks = MemoryClickRepository::new(store);

        let err = clicks
            .register("missing", NewClick::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_registration_respects_ceiling() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));
        let clicks = Arc::new(MemoryClickRepository::new(Arc::clone(&store)));

        let mut nl = new_link("race");
        nl.max_clicks = Some(5);
        let link = links.create(nl).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let clicks = Arc::clone(&clicks);
            handles.push(tokio::spawn(async move {
                clicks.register("race", NewClick::empty()).await
            }));
        }

        let mut recorded = 0;
        let mut limited = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                ClickOutcome::Recorded { .. } => recorded += 1,
                ClickOutcome::LimitReached => limited += 1,
            }
        }

        assert_eq!(recorded, 5);
        assert_eq!(limited, 15);
        assert_eq!(clicks.count_for(link.id).await.unwrap(), 5);
        let reloaded = links.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(reloaded.click_count, 5);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));
        let clicks = MemoryClickRepository::new(Arc::clone(&store));

        let link = links.create(new_link("hist")).await.unwrap();
        for ua in ["first", "second", "third"] {
            let mut click = NewClick::empty();
            click.user_agent = Some(ua.to_string());
            clicks.register("hist", click).await.unwrap();
        }

        let recent = clicks.recent(link.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user_agent.as_deref(), Some("third"));
        assert_eq!(recent[1].user_agent.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_update_patch_semantics() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));

        let mut nl = new_link("patchme");
        nl.expires_at = Some(Utc::now() + chrono::Duration::hours(1));
        let link = links.create(nl).await.unwrap();

        // Clearing the expiry requires the explicit Some(None).
        let updated = links
            .update(
                link.id,
                LinkPatch {
                    expires_at: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.expires_at.is_none());

        // An absent field leaves the value alone.
        let updated = links
            .update(
                link.id,
                LinkPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert!(updated.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_deactivate_is_one_shot() {
        let store = MemoryStore::new();
        let links = MemoryLinkRepository::new(Arc::clone(&store));

        let link = links.create(new_link("off")).await.unwrap();
        assert!(links.deactivate(link.id).await.unwrap());
        assert!(!links.deactivate(link.id).await.unwrap());
        assert!(!links.deactivate(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let repo = MemoryTokenRepository::new();

        let token = repo.create_token("ci", "hash-1").await.unwrap();
        assert!(repo.validate_token("hash-1").await.unwrap());
        assert!(!repo.validate_token("hash-2").await.unwrap());

        repo.revoke_token(token.id).await.unwrap();
        assert!(!repo.validate_token("hash-1").await.unwrap());

        let found = repo.find_by_name("ci").await.unwrap().unwrap();
        assert!(found.revoked_at.is_some());
    }
}
