//! Review route handlers

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{RateRequest, Review, ReviewDetailsResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// GET /api/teams/{team}/events/{event}/proposals/{id}/reviews
pub async fn review_details(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event, id)): Path<(String, String, Uuid)>,
) -> ApiResult<Json<SuccessResponse<ReviewDetailsResponse>>> {
    let details = state
        .reviews
        .review_details(claims.sub, &team, &event, id)
        .await?;
    Ok(Json(SuccessResponse::with_data("Reviews retrieved.", details)))
}

/// PUT /api/teams/{team}/events/{event}/proposals/{id}/review
pub async fn rate(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event, id)): Path<(String, String, Uuid)>,
    Json(payload): Json<RateRequest>,
) -> ApiResult<Json<SuccessResponse<Review>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let review = state
        .reviews
        .rate(claims.sub, &team, &event, id, payload)
        .await?;
    Ok(Json(SuccessResponse::with_data("Review saved.", review)))
}
