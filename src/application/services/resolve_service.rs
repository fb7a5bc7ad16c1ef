//! Redirect resolution: lookup, policy, atomic click registration.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{Link, NewClick};
use crate::domain::policy::{self, Deny, RequestContext};
use crate::domain::repositories::{ClickOutcome, ClickRepository, LinkRepository};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::device;

/// Request-side inputs for a resolution attempt, straight from the HTTP
/// layer.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Credential from the `password` query parameter or `X-Link-Password`.
    pub password: Option<String>,
    /// Country hint, e.g. from a CDN geo header.
    pub country: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub destination_url: String,
    pub click_count: i64,
}

/// Resolves short codes to destinations.
///
/// The pipeline per request: cache-or-store lookup, access policy, then
/// click registration as one atomic store step. Every denial leaves the
/// service as 404 except credential failures, which are 401; an outside
/// observer cannot distinguish "never existed" from "expired", "disabled",
/// "exhausted", or "not for you".
pub struct ResolveService {
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
    cache: Arc<dyn CacheService>,
    retry_tx: mpsc::Sender<ClickEvent>,
}

impl ResolveService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        cache: Arc<dyn CacheService>,
        retry_tx: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            links,
            clicks,
            cache,
            retry_tx,
        }
    }

    /// Resolves `code` for one visitor.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`]: unknown code, or any lifecycle/targeting
    ///   denial (deliberately indistinguishable)
    /// - [`AppError::Unauthorized`]: password required or incorrect
    /// - [`AppError::Unavailable`] / [`AppError::Internal`]: the lookup
    ///   itself failed (never click recording; that degrades silently)
    pub async fn resolve(&self, code: &str, request: ResolveRequest) -> Result<Resolved, AppError> {
        let link = self.lookup(code).await?;

        let ctx = RequestContext {
            now: Utc::now(),
            password: request.password.clone(),
            country: request.country.as_deref().map(str::to_ascii_uppercase),
            device: request
                .user_agent
                .as_deref()
                .and_then(device::classify)
                .map(str::to_string),
        };

        if let Err(deny) = policy::evaluate(&link, &ctx) {
            debug!(code, reason = deny.as_str(), "Resolution denied");
            metrics::counter!("snaplink_denials_total", "reason" => deny.as_str()).increment(1);
            return Err(Self::coarsen(deny, code));
        }

        let click = NewClick {
            referer: request.referer,
            user_agent: request.user_agent,
            ip: request.ip,
            country: ctx.country,
            device: ctx.device,
        };

        // The policy check above may have run against a cached record with a
        // stale click_count. That is fine: register re-checks the ceiling
        // atomically against the store, so the counter can never pass the
        // limit regardless of what the cache said.
        let click_count = match self.clicks.register(code, click.clone()).await {
            Ok(ClickOutcome::Recorded { click_count }) => {
                metrics::counter!("snaplink_redirects_total").increment(1);
                click_count
            }
            Ok(ClickOutcome::LimitReached) => {
                // Lost the race for the final click.
                debug!(code, "Denied at registration, limit reached");
                metrics::counter!("snaplink_denials_total", "reason" => Deny::LimitReached.as_str())
                    .increment(1);
                self.cache.invalidate(code).await;
                return Err(Self::coarsen(Deny::LimitReached, code));
            }
            Err(e) => {
                // The visitor already passed policy; recording must not cost
                // them the redirect. Hand the event to the retry worker.
                warn!(code, error = %e, "Click registration failed, queueing for retry");
                if self
                    .retry_tx
                    .try_send(ClickEvent::new(code, click))
                    .is_err()
                {
                    warn!(code, "Click retry queue full, dropping event");
                    metrics::counter!("snaplink_clicks_dropped_total").increment(1);
                }
                link.click_count
            }
        };

        Ok(Resolved {
            destination_url: link.destination_url,
            click_count,
        })
    }

    async fn lookup(&self, code: &str) -> Result<Link, AppError> {
        if let Some(link) = self.cache.get(code).await {
            debug!(code, "Cache hit");
            return Ok(link);
        }

        let link = self
            .links
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "code": code })))?;

        let cache = Arc::clone(&self.cache);
        let cached = link.clone();
        tokio::spawn(async move { cache.set(&cached).await });

        Ok(link)
    }

    /// Collapses a denial into its public-facing error.
    fn coarsen(deny: Deny, code: &str) -> AppError {
        if deny.is_credential_failure() {
            AppError::unauthorized("Password required", json!({ "code": code }))
        } else {
            // Same body as an unknown code on purpose.
            AppError::not_found("Link not found", json!({ "code": code }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{MockClickRepository, MockLinkRepository};
    use crate::infrastructure::cache::NullCache;
    use crate::utils::password;
    use async_trait::async_trait;
    use chrono::Duration;

    fn link() -> Link {
        Link {
            id: 1,
            code: "abc123".to_string(),
            destination_url: "https://example.com/landing".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            max_clicks: None,
            click_count: 0,
            last_clicked_at: None,
            password_hash: None,
            is_active: true,
            allowed_countries: None,
            allowed_devices: None,
            metadata: serde_json::json!({}),
        }
    }

    fn service(
        links: MockLinkRepository,
        clicks: MockClickRepository,
    ) -> (ResolveService, mpsc::Receiver<ClickEvent>) {
        let (tx, rx) = mpsc::channel(4);
        (
            ResolveService::new(Arc::new(links), Arc::new(clicks), Arc::new(NullCache), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn test_resolve_records_and_redirects() {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .withf(|code| code == "abc123")
            .returning(|_| Ok(Some(link())));

        let mut clicks = MockClickRepository::new();
        clicks
            .expect_register()
            .withf(|code, _| code == "abc123")
            .times(1)
            .returning(|_, _| Ok(ClickOutcome::Recorded { click_count: 1 }));

        let (service, _rx) = service(links, clicks);
        let resolved = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap();

        assert_eq!(resolved.destination_url, "https://example.com/landing");
        assert_eq!(resolved.click_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| Ok(None));
        let mut clicks = MockClickRepository::new();
        clicks.expect_register().times(0);

        let (service, _rx) = service(links, clicks);
        let err = service
            .resolve("missing", ResolveRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_inactive_link_masquerades_as_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| {
            let mut l = link();
            l.is_active = false;
            Ok(Some(l))
        });
        let mut clicks = MockClickRepository::new();
        clicks.expect_register().times(0);

        let (service, _rx) = service(links, clicks);
        let err = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_expired_link_masquerades_as_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| {
            let mut l = link();
            l.expires_at = Some(Utc::now() - Duration::minutes(1));
            Ok(Some(l))
        });
        let mut clicks = MockClickRepository::new();
        clicks.expect_register().times(0);

        let (service, _rx) = service(links, clicks);
        let err = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_password_denials_are_unauthorized() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| {
            let mut l = link();
            l.password_hash = Some(password::hash("hunter2").unwrap());
            Ok(Some(l))
        });
        let mut clicks = MockClickRepository::new();
        clicks.expect_register().times(1).returning(|_, _| {
            Ok(ClickOutcome::Recorded { click_count: 1 })
        });

        let (service, _rx) = service(links, clicks);

        let err = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let err = service
            .resolve(
                "abc123",
                ResolveRequest {
                    password: Some("wrong".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let resolved = service
            .resolve(
                "abc123",
                ResolveRequest {
                    password: Some("hunter2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.destination_url, "https://example.com/landing");
    }

    #[tokio::test]
    async fn test_limit_race_loser_is_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| {
            let mut l = link();
            l.max_clicks = Some(5);
            l.click_count = 4;
            Ok(Some(l))
        });
        // Policy passes on the snapshot but the store says the ceiling was
        // hit in the meantime.
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_register()
            .times(1)
            .returning(|_, _| Ok(ClickOutcome::LimitReached));

        let (service, _rx) = service(links, clicks);
        let err = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_recording_failure_still_redirects_and_queues_retry() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| Ok(Some(link())));
        let mut clicks = MockClickRepository::new();
        clicks.expect_register().times(1).returning(|_, _| {
            Err(AppError::unavailable("store down", serde_json::json!({})))
        });

        let (service, mut rx) = service(links, clicks);
        let resolved = service
            .resolve(
                "abc123",
                ResolveRequest {
                    user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(resolved.destination_url, "https://example.com/landing");

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.code, "abc123");
        assert!(queued.click.user_agent.is_some());
    }

    #[tokio::test]
    async fn test_device_targeting_uses_user_agent() {
        const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_| {
            let mut l = link();
            l.allowed_devices = Some(vec!["mobile".to_string()]);
            Ok(Some(l))
        });
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_register()
            .withf(|_, click| click.device.as_deref() == Some("mobile"))
            .times(1)
            .returning(|_, _| Ok(ClickOutcome::Recorded { click_count: 1 }));

        let (service, _rx) = service(links, clicks);

        let from_phone = service
            .resolve(
                "abc123",
                ResolveRequest {
                    user_agent: Some(IPHONE.to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(from_phone.is_ok());

        let no_agent = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(no_agent, AppError::NotFound { .. }));
    }

    struct StaticCache(Link);

    #[async_trait]
    impl CacheService for StaticCache {
        async fn get(&self, _code: &str) -> Option<Link> {
            Some(self.0.clone())
        }
        async fn set(&self, _link: &Link) {}
        async fn invalidate(&self, _code: &str) {}
        async fn health_check(&self) -> Option<bool> {
            Some(true)
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_store_lookup() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().times(0);
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_register()
            .times(1)
            .returning(|_, _| Ok(ClickOutcome::Recorded { click_count: 3 }));

        let (tx, _rx) = mpsc::channel(4);
        let service = ResolveService::new(
            Arc::new(links),
            Arc::new(clicks),
            Arc::new(StaticCache(link())),
            tx,
        );

        let resolved = service
            .resolve("abc123", ResolveRequest::default())
            .await
            .unwrap();
        assert_eq!(resolved.click_count, 3);
    }
}
