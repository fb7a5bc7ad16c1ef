//! Handlers for link creation and management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::api::dto::{CreateLinkRequest, LinkResponse, UpdateLinkRequest};
use crate::application::services::CreateLink;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Responses
///
/// - **201 Created** with the link record
/// - **409 Conflict** if the custom code is taken
/// - **422 Unprocessable Entity** on validation failure
pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let input = CreateLink {
        destination_url: request.url,
        custom_code: request.custom_code,
        validity_minutes: request.validity_minutes,
        max_clicks: request.max_clicks,
        password: request.password,
        allowed_countries: request.allowed_countries,
        allowed_devices: request.allowed_devices,
        metadata: request.metadata,
    };

    let link = state.link_service.create_link(input).await?;
    let short_url = state.short_url(&link.code);

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::from_link(link, short_url)),
    ))
}

/// Returns a link by id.
///
/// # Endpoint
///
/// `GET /api/links/{id}`
pub async fn get_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.link_service.get_link(id).await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::from_link(link, short_url)))
}

/// Partially updates a link.
///
/// # Endpoint
///
/// `PATCH /api/links/{id}`
pub async fn update_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let link = state.link_service.update_link(id, request.into()).await?;

    // Mutations must not be served from a stale cache entry.
    state.cache.invalidate(&link.code).await;

    let short_url = state.short_url(&link.code);
    Ok(Json(LinkResponse::from_link(link, short_url)))
}

/// Soft-deactivates a link. The code stays reserved.
///
/// # Endpoint
///
/// `DELETE /api/links/{id}`
///
/// # Responses
///
/// - **204 No Content** on success
/// - **404 Not Found** if unknown or already inactive
pub async fn delete_link_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    // Fetch first: the code is needed for cache invalidation.
    let link = state.link_service.get_link(id).await?;
    state.link_service.deactivate_link(id).await?;
    state.cache.invalidate(&link.code).await;

    Ok(StatusCode::NO_CONTENT)
}
