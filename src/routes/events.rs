//! Event route handlers

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{
    ApiKeyResponse, CreateEventRequest, EventResponse, PublicEvent, SuccessResponse,
    UpdateEventRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

/// POST /api/teams/{team}/events
pub async fn create_event(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(team): Path<String>,
    Json(payload): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<EventResponse>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let event = state.events.create_event(claims.sub, &team, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Event created successfully.", event)),
    ))
}

/// GET /api/teams/{team}/events
pub async fn list_events(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(team): Path<String>,
) -> ApiResult<Json<SuccessResponse<Vec<EventResponse>>>> {
    let events = state.events.list_team_events(claims.sub, &team).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} event(s).", events.len()),
        events,
    )))
}

/// PATCH /api/teams/{team}/events/{event}
pub async fn update_event(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event)): Path<(String, String)>,
    Json(payload): Json<UpdateEventRequest>,
) -> ApiResult<Json<SuccessResponse<EventResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let event = state
        .events
        .update_event(claims.sub, &team, &event, payload)
        .await?;
    Ok(Json(SuccessResponse::with_data("Event updated.", event)))
}

/// POST /api/teams/{team}/events/{event}/api-key
pub async fn generate_api_key(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event)): Path<(String, String)>,
) -> ApiResult<Json<SuccessResponse<ApiKeyResponse>>> {
    let key = state.events.generate_api_key(claims.sub, &team, &event).await?;
    Ok(Json(SuccessResponse::with_data(
        "API key generated. It will not be shown again.",
        key,
    )))
}

/// GET /api/events/{slug}
pub async fn get_public_event(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<SuccessResponse<PublicEvent>>> {
    let event = state.events.get_public_event(&slug).await?;
    Ok(Json(SuccessResponse::with_data("Event retrieved.", event)))
}
