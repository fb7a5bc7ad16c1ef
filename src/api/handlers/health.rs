//! Handler for the health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage_check = check_storage(&state).await;
    let queue_check = check_click_queue(&state);
    let cache_check = check_cache(&state).await;

    let all_healthy = storage_check.status == "ok"
        && queue_check.status == "ok"
        && cache_check.status != "error";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage: storage_check,
            click_queue: queue_check,
            cache: cache_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Probes the store with a lookup that is allowed to miss.
async fn check_storage(state: &AppState) -> CheckStatus {
    match state.links.find_by_code("health-probe").await {
        Ok(_) => CheckStatus {
            status: "ok".to_string(),
            message: "Store reachable".to_string(),
        },
        Err(e) => CheckStatus {
            status: "error".to_string(),
            message: format!("Store check failed: {e}"),
        },
    }
}

fn check_click_queue(state: &AppState) -> CheckStatus {
    if state.click_tx.is_closed() {
        CheckStatus {
            status: "error".to_string(),
            message: "Click retry worker stopped".to_string(),
        }
    } else {
        CheckStatus {
            status: "ok".to_string(),
            message: format!("Capacity: {}", state.click_tx.capacity()),
        }
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    match state.cache.health_check().await {
        None => CheckStatus {
            status: "disabled".to_string(),
            message: "No cache configured".to_string(),
        },
        Some(true) => CheckStatus {
            status: "ok".to_string(),
            message: "Redis connected".to_string(),
        },
        Some(false) => CheckStatus {
            status: "error".to_string(),
            message: "Redis unreachable".to_string(),
        },
    }
}
