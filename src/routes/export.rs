//! Event export for third-party tools
//!
//! Authenticated with the event API key, sent either in the `X-API-Key`
//! header or in the `key` query parameter.

use super::API_KEY_HEADER;
use crate::error::ApiResult;
use crate::models::{EventExport, ExportQuery, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

/// GET /api/v1/event/{slug}
pub async fn export_event(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(mut query): Query<ExportQuery>,
) -> ApiResult<Json<SuccessResponse<EventExport>>> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        query.key = Some(key.to_string());
    }
    let export = state.events.export_event(&slug, query).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} proposal(s) exported.", export.proposals.len()),
        export,
    )))
}
