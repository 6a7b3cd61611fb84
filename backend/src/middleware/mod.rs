//! Middleware for the In-Paw-Dia API
//!
//! This module provides middleware for request tracing, rate limiting,
//! security headers, and authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::{
    AdminAccess, AdminUser, AuthenticatedUser, EditorAccess, EditorUser, RequireRole, RoleGate,
    ViewerAccess, ViewerUser,
};
pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use self::tracing::{client_ip, request_tracing};
