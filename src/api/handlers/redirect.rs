//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::application::services::ResolveRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for the redirect endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    /// Credential for password-protected links. Also accepted via the
    /// `X-Link-Password` header.
    pub password: Option<String>,
}

/// Redirects a short code to its destination URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Collect client hints: password, country, device, referer, IP
/// 2. Resolve through cache/store, access policy, click registration
/// 3. Return 307 Temporary Redirect
///
/// # Errors
///
/// Returns 404 for unknown, inactive, expired, exhausted, or out-of-target
/// links (indistinguishably), 401 when a password is required or wrong.
pub async fn redirect_handler(
    Path(code): Path<String>,
    Query(query): Query<RedirectQuery>,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let password = query
        .password
        .or_else(|| header_string(&headers, "x-link-password"));

    let country = header_string(&headers, "cf-ipcountry")
        .or_else(|| header_string(&headers, "x-country"))
        .filter(|c| c.len() == 2);

    let request = ResolveRequest {
        password,
        country,
        referer: header_string(&headers, header::REFERER.as_str()),
        user_agent: header_string(&headers, header::USER_AGENT.as_str()),
        ip: Some(client_ip(&headers, addr)),
    };

    let resolved = state.resolve_service.resolve(&code, request).await?;

    Ok(Redirect::temporary(&resolved.destination_url))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First hop of X-Forwarded-For when present, otherwise the peer address.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    header_string(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, addr), "203.0.113.9");
        assert_eq!(client_ip(&HeaderMap::new(), addr), "127.0.0.1");
    }

    #[test]
    fn test_header_string_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-country", "  ".parse().unwrap());
        assert_eq!(header_string(&headers, "x-country"), None);

        headers.insert("x-country", "DE".parse().unwrap());
        assert_eq!(header_string(&headers, "x-country").as_deref(), Some("DE"));
    }
}
