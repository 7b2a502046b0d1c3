//! Team route handlers

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{
    CreateTeamRequest, MemberResponse, MessageResponse, SuccessResponse, TeamMember,
    TeamWithRole, UpdateMemberRoleRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// POST /api/teams
pub async fn create_team(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<TeamWithRole>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let team = state.teams.create_team(claims.sub, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Team created successfully.", team)),
    ))
}

/// GET /api/teams
pub async fn list_teams(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<TeamWithRole>>>> {
    let teams = state.teams.list_teams(claims.sub).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} team(s).", teams.len()),
        teams,
    )))
}

/// GET /api/teams/{team}
pub async fn get_team(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(team): Path<String>,
) -> ApiResult<Json<SuccessResponse<TeamWithRole>>> {
    let team = state.teams.get_team(claims.sub, &team).await?;
    Ok(Json(SuccessResponse::with_data("Team retrieved.", team)))
}

/// GET /api/teams/{team}/members
pub async fn list_members(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(team): Path<String>,
) -> ApiResult<Json<SuccessResponse<Vec<MemberResponse>>>> {
    let members = state.teams.list_members(claims.sub, &team).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} member(s).", members.len()),
        members,
    )))
}

/// PATCH /api/teams/{team}/members/{user}
pub async fn change_member_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, member_id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<SuccessResponse<TeamMember>>> {
    let member = state
        .teams
        .change_member_role(claims.sub, &team, member_id, payload.role)
        .await?;
    Ok(Json(SuccessResponse::with_data("Member role updated.", member)))
}

/// DELETE /api/teams/{team}/members/{user}
pub async fn remove_member(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((team, member_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state.teams.remove_member(claims.sub, &team, member_id).await?;
    Ok(Json(MessageResponse::new("Member removed from the team.")))
}

/// POST /api/teams/{team}/leave
pub async fn leave_team(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(team): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.teams.leave_team(claims.sub, &team).await?;
    Ok(Json(MessageResponse::new("You left the team.")))
}

/// POST /api/invitations/{code}/accept
pub async fn accept_invitation(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> ApiResult<Json<SuccessResponse<TeamWithRole>>> {
    let team = state.teams.join_team(claims.sub, &code).await?;
    Ok(Json(SuccessResponse::with_data("Invitation accepted.", team)))
}
