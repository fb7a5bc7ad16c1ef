//! Shared application state injected into all handlers.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{AuthService, LinkService, ResolveService, StatsService};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{ClickRepository, LinkRepository, TokenRepository};
use crate::infrastructure::cache::CacheService;

/// Knobs the state assembly needs beyond the repositories themselves.
#[derive(Debug, Clone)]
pub struct StateSettings {
    pub base_url: String,
    pub code_length: usize,
    pub require_expiry: bool,
    pub token_signing_secret: String,
    pub api_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub resolve_service: Arc<ResolveService>,
    pub stats_service: Arc<StatsService>,
    pub auth_service: Arc<AuthService>,
    /// Kept for the health probe; handlers go through the services.
    pub links: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub click_tx: mpsc::Sender<ClickEvent>,
    pub base_url: String,
}

impl AppState {
    /// Wires services over any combination of backends.
    pub fn assemble(
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        tokens: Arc<dyn TokenRepository>,
        cache: Arc<dyn CacheService>,
        click_tx: mpsc::Sender<ClickEvent>,
        settings: StateSettings,
    ) -> Self {
        let link_service = Arc::new(LinkService::new(
            Arc::clone(&links),
            settings.code_length,
            settings.require_expiry,
        ));
        let resolve_service = Arc::new(ResolveService::new(
            Arc::clone(&links),
            Arc::clone(&clicks),
            Arc::clone(&cache),
            click_tx.clone(),
        ));
        let stats_service = Arc::new(StatsService::new(Arc::clone(&links), Arc::clone(&clicks)));
        let auth_service = Arc::new(
            AuthService::new(tokens, settings.token_signing_secret)
                .with_bootstrap_token(settings.api_token.as_deref()),
        );

        Self {
            link_service,
            resolve_service,
            stats_service,
            auth_service,
            links,
            cache,
            click_tx,
            base_url: settings.base_url,
        }
    }

    /// Renders the public short URL for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{code}", self.base_url.trim_end_matches('/'))
    }
}
