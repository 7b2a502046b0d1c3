//! Authentication route handlers
//!
//! Provides register, login and refresh endpoints.

use crate::auth::{create_tokens, refresh_tokens, TokenPair};
use crate::error::{validation_error, ApiResult};
use crate::models::{
    LoginRequest, RefreshRequest, RegisterRequest, SuccessResponse, UserResponse,
};
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::debug;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<AuthPayload>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let user = state.users.register(payload).await?;
    let tokens = create_tokens(&state.jwt_secret, user.id, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Account created successfully.",
            AuthPayload {
                user: UserResponse::from(&user),
                tokens,
            },
        )),
    ))
}

/// POST /api/auth/login
///
/// Authenticate with email and password, receive JWT tokens.
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<SuccessResponse<AuthPayload>>> {
    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let tokens = create_tokens(&state.jwt_secret, user.id, &user.email)?;
    debug!(user = %user.id, "User logged in");

    Ok(Json(SuccessResponse::with_data(
        "Logged in successfully.",
        AuthPayload {
            user: UserResponse::from(&user),
            tokens,
        },
    )))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<SharedState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<SuccessResponse<TokenPair>>> {
    let tokens = refresh_tokens(&state.jwt_secret, &payload.refresh_token)?;
    Ok(Json(SuccessResponse::with_data("Tokens refreshed.", tokens)))
}
