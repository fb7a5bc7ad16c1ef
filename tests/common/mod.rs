#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::routing::get;
use axum::{Router, middleware};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::mpsc;

use snaplink::api::handlers::redirect_handler;
use snaplink::api::middleware::auth;
use snaplink::domain::click_event::ClickEvent;
use snaplink::domain::entities::{Link, NewLink};
use snaplink::domain::repositories::{ClickRepository, LinkRepository};
use snaplink::infrastructure::cache::NullCache;
use snaplink::infrastructure::persistence::{
    MemoryClickRepository, MemoryLinkRepository, MemoryStore, MemoryTokenRepository,
};
use snaplink::state::{AppState, StateSettings};
use snaplink::utils::password;

pub const TEST_TOKEN: &str = "test-api-token";
pub const SIGNING_SECRET: &str = "test-signing-secret";

pub struct TestApp {
    pub state: AppState,
    pub links: Arc<dyn LinkRepository>,
    pub clicks: Arc<dyn ClickRepository>,
    pub click_rx: mpsc::Receiver<ClickEvent>,
}

/// Assembles an application over the in-memory backend with a bootstrap
/// API token.
pub fn create_test_app() -> TestApp {
    let store = MemoryStore::new();
    let links: Arc<dyn LinkRepository> = Arc::new(MemoryLinkRepository::new(Arc::clone(&store)));
    let clicks: Arc<dyn ClickRepository> = Arc::new(MemoryClickRepository::new(store));
    let tokens = Arc::new(MemoryTokenRepository::new());

    let (click_tx, click_rx) = mpsc::channel(100);

    let state = AppState::assemble(
        Arc::clone(&links),
        Arc::clone(&clicks),
        tokens,
        Arc::new(NullCache),
        click_tx,
        StateSettings {
            base_url: "http://localhost:3000".to_string(),
            code_length: 7,
            require_expiry: false,
            token_signing_secret: SIGNING_SECRET.to_string(),
            api_token: Some(TEST_TOKEN.to_string()),
        },
    );

    TestApp {
        state,
        links,
        clicks,
        click_rx,
    }
}

/// Router with only the public redirect route, plus a fake peer address so
/// `ConnectInfo` extraction works under the in-process test server.
pub fn public_router(state: AppState) -> Router {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .layer(MockConnectInfoLayer)
        .with_state(state)
}

/// Router with the authenticated API routes.
pub fn api_router(state: AppState) -> Router {
    snaplink::api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer))
        .with_state(state)
}

fn base_new_link(code: &str, url: &str) -> NewLink {
    NewLink {
        code: code.to_string(),
        destination_url: url.to_string(),
        expires_at: None,
        max_clicks: None,
        password_hash: None,
        allowed_countries: None,
        allowed_devices: None,
        metadata: json!({}),
    }
}

pub async fn create_test_link(links: &Arc<dyn LinkRepository>, code: &str, url: &str) -> Link {
    links.create(base_new_link(code, url)).await.unwrap()
}

pub async fn create_expired_link(
    links: &Arc<dyn LinkRepository>,
    code: &str,
    url: &str,
    expires_at: DateTime<Utc>,
) -> Link {
    let mut new_link = base_new_link(code, url);
    new_link.expires_at = Some(expires_at);
    links.create(new_link).await.unwrap()
}

pub async fn create_password_link(
    links: &Arc<dyn LinkRepository>,
    code: &str,
    url: &str,
    plaintext: &str,
) -> Link {
    let mut new_link = base_new_link(code, url);
    new_link.password_hash = Some(password::hash(plaintext).unwrap());
    links.create(new_link).await.unwrap()
}

pub async fn create_limited_link(
    links: &Arc<dyn LinkRepository>,
    code: &str,
    url: &str,
    max_clicks: i64,
) -> Link {
    let mut new_link = base_new_link(code, url);
    new_link.max_clicks = Some(max_clicks);
    links.create(new_link).await.unwrap()
}

/// Injects a fixed peer address so handlers using `ConnectInfo` work
/// without a real TCP connection.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> tower::Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
