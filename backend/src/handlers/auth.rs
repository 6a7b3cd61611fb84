//! Authentication HTTP handlers
//!
//! Endpoints for email/password sign-in and refresh-token sessions.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::{AuthenticatedUser, ViewerUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthResponse, CurrentUserResponse, LoginRequest, LogoutAllResponse, MessageResponse,
    RefreshResponse, RefreshTokenRequest, RegisterRequest,
};
use crate::state::AppState;

/// POST /auth/register - Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state.auth_service.register(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user: session.user.into(),
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

/// POST /auth/login - Exchange credentials for a token pair
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state.auth_service.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        success: true,
        user: session.user.into(),
        access_token: session.tokens.access_token,
        refresh_token: session.tokens.refresh_token,
    }))
}

/// POST /auth/refresh - Rotate a refresh token into a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let token = req
        .token()
        .ok_or_else(|| ApiError::BadRequest("Refresh token is required".to_string()))?;

    let tokens = state.auth_service.refresh_tokens(token).await?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// POST /auth/logout - Revoke the presented refresh token
///
/// Always succeeds; an absent, malformed or unknown token is simply ignored.
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();

    if let Some(token) = req.token() {
        state.auth_service.logout(token).await?;
    }

    Ok(Json(MessageResponse::ok("Logged out successfully")))
}

/// POST /auth/logout-all - Revoke every refresh token of the caller
pub async fn logout_all(
    State(state): State<AppState>,
    user: ViewerUser,
) -> ApiResult<Json<LogoutAllResponse>> {
    let revoked_sessions = state.auth_service.logout_all(user.user.user_id).await?;

    Ok(Json(LogoutAllResponse {
        success: true,
        revoked_sessions,
    }))
}

/// GET /auth/me - Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;

    Ok(Json(CurrentUserResponse {
        success: true,
        user: user.into(),
    }))
}
