//! Admin user management routes

use axum::{
    routing::{delete, put},
    Router,
};

use crate::handlers::users::{delete_user, update_user_role};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/role", put(update_user_role))
        .route("/users/:id", delete(delete_user))
}
