//! Route definitions for the In-Paw-Dia API

mod auth;
mod pets;
mod user;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};

pub use auth::auth_routes;
pub use pets::pet_routes;
pub use user::user_routes;

use crate::handlers::{health_check, not_found};
use crate::middleware::{hsts_header, rate_limit, request_tracing, security_headers, RateLimiter};
use crate::state::AppState;

/// Assemble the full application router
///
/// API routes live under `/api`; `/health` sits at the root. CORS is left to
/// the caller since it depends on deployment configuration.
pub fn build_router(state: AppState, rate_limiter: RateLimiter) -> Router {
    let api = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(pet_routes());

    let production = state.environment.is_production();

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn(security_headers))
        .layer(from_fn(request_tracing))
        .layer(from_fn_with_state(rate_limiter, rate_limit));

    if production {
        router.layer(from_fn(hsts_header))
    } else {
        router
    }
}
