//! Comment route handlers

use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{
    AddCommentRequest, CommentListQuery, CommentView, MessageResponse, SuccessResponse,
};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// GET /api/proposals/{id}/comments?channel=
pub async fn list_comments(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<CommentView>>>> {
    let comments = state
        .comments
        .list_comments(claims.sub, id, query.channel)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} comment(s).", comments.len()),
        comments,
    )))
}

/// POST /api/proposals/{id}/comments
pub async fn add_comment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CommentView>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let comment = state.comments.add_comment(claims.sub, id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Comment added.", comment)),
    ))
}

/// DELETE /api/proposals/{id}/comments/{comment}
pub async fn remove_comment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((id, comment)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state.comments.remove_comment(claims.sub, id, comment).await?;
    Ok(Json(MessageResponse::new("Comment removed.")))
}
