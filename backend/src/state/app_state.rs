//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, TokenService};
use crate::config::Environment;
use crate::store::PetStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub pets: Arc<dyn PetStore>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        pets: Arc<dyn PetStore>,
        environment: Environment,
    ) -> Self {
        Self {
            auth_service,
            pets,
            environment,
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.tokens().clone()
    }
}
