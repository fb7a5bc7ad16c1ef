//! Cache abstraction for hot-path link lookups.
//!
//! The resolver consults the cache before the store and treats every cache
//! failure as a miss. A broken cache degrades latency, never correctness.

use async_trait::async_trait;

use crate::domain::entities::Link;

/// Read-through cache over whole link records, keyed by short code.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the cached record, or `None` on miss or any cache failure.
    async fn get(&self, code: &str) -> Option<Link>;

    /// Stores a record. Failures are logged and swallowed.
    async fn set(&self, link: &Link);

    /// Drops a record after any mutation so readers never see stale
    /// lifecycle state longer than one round trip.
    async fn invalidate(&self, code: &str);

    /// Liveness probe for the health endpoint. `None` means no real cache
    /// is configured.
    async fn health_check(&self) -> Option<bool>;
}
