//! No-op cache used when no Redis URL is configured.

use async_trait::async_trait;

use super::service::CacheService;
use crate::domain::entities::Link;

/// Cache that never hits. Lets the rest of the code treat caching as always
/// present.
pub struct NullCache;

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _code: &str) -> Option<Link> {
        None
    }

    async fn set(&self, _link: &Link) {}

    async fn invalidate(&self, _code: &str) {}

    async fn health_check(&self) -> Option<bool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_cache_always_misses() {
        let cache = NullCache;
        assert!(cache.get("anything").await.is_none());
        assert_eq!(cache.health_check().await, None);
    }
}
