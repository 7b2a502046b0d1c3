//! Proposal route handlers, speaker and organizer side

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{
    ConfirmationRequest, DeliberationRequest, MessageResponse, Proposal, ProposalListQuery,
    ProposalPage, PublicationRequest, PublicationResult, SubmitProposalRequest, SuccessResponse,
    UpdateProposalRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// POST /api/events/{slug}/proposals
pub async fn submit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(payload): Json<SubmitProposalRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Proposal>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let proposal = state.proposals.submit(claims.sub, &slug, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Proposal submitted.", proposal)),
    ))
}

/// PATCH /api/proposals/{id}
pub async fn update(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProposalRequest>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let proposal = state.proposals.update(claims.sub, id, payload).await?;
    Ok(Json(SuccessResponse::with_data("Proposal updated.", proposal)))
}

/// DELETE /api/proposals/{id}
pub async fn withdraw(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.proposals.withdraw(claims.sub, id).await?;
    Ok(Json(MessageResponse::new("Proposal withdrawn.")))
}

/// POST /api/proposals/{id}/confirmation
pub async fn confirm(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmationRequest>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    let proposal = state
        .proposals
        .confirm(claims.sub, id, payload.answer)
        .await?;
    Ok(Json(SuccessResponse::with_data("Answer recorded.", proposal)))
}

/// GET /api/teams/{team}/events/{event}/proposals
pub async fn list_event_proposals(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event)): Path<(String, String)>,
    Query(query): Query<ProposalListQuery>,
) -> ApiResult<Json<SuccessResponse<ProposalPage>>> {
    let page = state
        .proposals
        .list_event_proposals(claims.sub, &team, &event, query)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} proposal(s).", page.total),
        page,
    )))
}

/// POST /api/teams/{team}/events/{event}/proposals/{id}/deliberation
pub async fn deliberate(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event, id)): Path<(String, String, Uuid)>,
    Json(payload): Json<DeliberationRequest>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    let proposal = state
        .proposals
        .deliberate(claims.sub, &team, &event, id, payload.status)
        .await?;
    Ok(Json(SuccessResponse::with_data("Proposal deliberated.", proposal)))
}

/// POST /api/teams/{team}/events/{event}/publication
pub async fn publish_results(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, event)): Path<(String, String)>,
    Json(payload): Json<PublicationRequest>,
) -> ApiResult<Json<SuccessResponse<PublicationResult>>> {
    let result = state
        .proposals
        .publish_results(claims.sub, &team, &event, payload)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} result(s) published.", result.published),
        result,
    )))
}
