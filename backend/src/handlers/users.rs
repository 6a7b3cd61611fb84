//! Admin user management handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use uuid::Uuid;

use super::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{CurrentUserResponse, MessageResponse, UpdateRoleRequest};
use crate::state::AppState;

/// PUT /users/:id/role - Change a user's role
pub async fn update_user_role(
    State(state): State<AppState>,
    admin: AdminUser,
    user_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let Path(user_id) = user_id?;
    let Json(req) = payload?;

    let user = state.auth_service.set_role(user_id, req.role).await?;
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, "Role updated by admin");

    Ok(Json(CurrentUserResponse {
        success: true,
        user: user.into(),
    }))
}

/// DELETE /users/:id - Delete an account
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(user_id) = user_id?;

    if user_id == admin.user.user_id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    state.auth_service.delete_user(user_id).await?;

    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
