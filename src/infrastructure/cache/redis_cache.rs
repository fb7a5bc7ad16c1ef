//! Redis-backed link cache.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, warn};

use super::service::CacheService;
use crate::domain::entities::Link;

const KEY_PREFIX: &str = "snaplink:link:";

/// Link cache over a Redis connection manager.
///
/// The manager reconnects on its own; every operation here is fail-open, so
/// a Redis outage shows up as a stream of misses plus warn logs.
pub struct RedisCache {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisCache {
    /// Connects to Redis and verifies the connection with a ping.
    pub async fn connect(url: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        let mut test_conn = conn.clone();
        test_conn.ping::<()>().await?;
        info!("Connected to Redis");

        Ok(Self { conn, ttl_seconds })
    }

    fn key(code: &str) -> String {
        format!("{KEY_PREFIX}{code}")
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, code: &str) -> Option<Link> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(Self::key(code)).await {
            Ok(value) => value,
            Err(e) => {
                warn!(code, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(link) => Some(link),
            Err(e) => {
                // Stale encoding from an older release; drop it.
                debug!(code, error = %e, "Evicting undecodable cache entry");
                self.invalidate(code).await;
                None
            }
        }
    }

    async fn set(&self, link: &Link) {
        let payload = match serde_json::to_string(link) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(code = link.code, error = %e, "Failed to encode link for cache");
                return;
            }
        };

        let mut conn = self.conn.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(Self::key(&link.code), payload, self.ttl_seconds)
            .await
        {
            warn!(code = link.code, error = %e, "Cache write failed");
        }
    }

    async fn invalidate(&self, code: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(Self::key(code)).await {
            warn!(code, error = %e, "Cache invalidation failed");
        }
    }

    async fn health_check(&self) -> Option<bool> {
        let mut conn = self.conn.clone();
        Some(conn.ping::<()>().await.is_ok())
    }
}
