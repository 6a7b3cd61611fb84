//! Breed catalog handlers
//!
//! Reads are public; writes go through the role gate.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, EditorUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{MessageResponse, PetFilter, PetInput, PetResponse, PetsResponse};
use crate::state::AppState;

fn not_found() -> ApiError {
    ApiError::NotFound("Pet not found".to_string())
}

/// GET /pets - List breeds, optionally filtered by `?type=dog|cat`
pub async fn list_pets(
    State(state): State<AppState>,
    filter: Result<Query<PetFilter>, QueryRejection>,
) -> ApiResult<Json<PetsResponse>> {
    let Query(filter) = filter?;
    let data = state.pets.list(&filter).await?;

    Ok(Json(PetsResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// GET /pets/:id
pub async fn get_pet(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PetResponse>> {
    let Path(id) = id?;
    let pet = state.pets.get(id).await?.ok_or_else(not_found)?;

    Ok(Json(PetResponse {
        success: true,
        message: None,
        data: pet,
    }))
}

/// POST /pets - editor or admin
pub async fn create_pet(
    State(state): State<AppState>,
    editor: EditorUser,
    payload: Result<Json<PetInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PetResponse>)> {
    let Json(input) = payload?;
    let input = input.normalized();
    input.validate()?;

    let pet = state.pets.create(input).await?;
    tracing::info!(pet_id = %pet.id, user_id = %editor.user.user_id, "Pet created");

    Ok((
        StatusCode::CREATED,
        Json(PetResponse {
            success: true,
            message: Some("Pet created successfully".to_string()),
            data: pet,
        }),
    ))
}

/// PUT /pets/:id - editor or admin
pub async fn update_pet(
    State(state): State<AppState>,
    editor: EditorUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PetInput>, JsonRejection>,
) -> ApiResult<Json<PetResponse>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let input = input.normalized();
    input.validate()?;

    let pet = state.pets.update(id, input).await?.ok_or_else(not_found)?;
    tracing::info!(pet_id = %pet.id, user_id = %editor.user.user_id, "Pet updated");

    Ok(Json(PetResponse {
        success: true,
        message: Some("Pet updated successfully".to_string()),
        data: pet,
    }))
}

/// DELETE /pets/:id - admin only
pub async fn delete_pet(
    State(state): State<AppState>,
    admin: AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = id?;

    if !state.pets.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(pet_id = %id, user_id = %admin.user.user_id, "Pet deleted");

    Ok(Json(MessageResponse::ok("Pet deleted successfully")))
}
