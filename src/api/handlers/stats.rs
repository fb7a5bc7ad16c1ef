//! Handler for per-link statistics.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::api::dto::{StatsQuery, StatsResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Returns click statistics for a link: lifetime counter, lifecycle fields,
/// and a window of recent events.
///
/// # Endpoint
///
/// `GET /api/links/{id}/stats?limit=50`
pub async fn stats_handler(
    Path(id): Path<i64>,
    Query(query): Query<StatsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.stats_service.stats_for(id, query.limit).await?;

    Ok(Json(StatsResponse::from(stats)))
}
