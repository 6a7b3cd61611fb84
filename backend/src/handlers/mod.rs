//! API handlers for the In-Paw-Dia backend

pub mod auth;
pub mod pets;
pub mod users;

use axum::{extract::State, http::Uri, Json};

use crate::error::ApiError;
use crate::models::HealthResponse;
use crate::state::AppState;

// Re-export extractors from middleware for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, EditorUser, ViewerUser};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Server is running".to_string(),
        environment: state.environment.as_str().to_string(),
    })
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Not found - {}", uri.path()))
}
