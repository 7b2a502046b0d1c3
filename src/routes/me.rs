//! Current user: profile, notifications and own proposals

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{
    SpeakerNotification, SpeakerProposal, SuccessResponse, UpdateProfileRequest, UserResponse,
};
use crate::state::SharedState;
use axum::{
    extract::{Extension, State},
    Json,
};
use validator::Validate;

/// GET /api/me
pub async fn get_me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    let user = state.users.profile(claims.sub).await?;
    Ok(Json(SuccessResponse::with_data(
        "Profile retrieved.",
        UserResponse::from(&user),
    )))
}

/// PATCH /api/me
pub async fn update_me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let user = state.users.update_profile(claims.sub, payload).await?;
    Ok(Json(SuccessResponse::with_data(
        "Profile updated.",
        UserResponse::from(&user),
    )))
}

/// GET /api/me/notifications
pub async fn notifications(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<SpeakerNotification>>>> {
    let feed = state.proposals.notifications(claims.sub).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} notification(s).", feed.len()),
        feed,
    )))
}

/// GET /api/me/proposals
pub async fn my_proposals(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<SpeakerProposal>>>> {
    let proposals = state.proposals.list_own(claims.sub).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposals retrieved.",
        proposals,
    )))
}
