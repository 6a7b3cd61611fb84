//! Authentication middleware
//!
//! Extractors for bearer-token verification and role gating. Access tokens
//! are checked by signature and expiry only; no store lookup happens here.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::auth::{TokenService, TokenType};
use crate::error::ApiError;
use crate::models::UserRole;

/// Authenticated user extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

/// Extractor for authenticated users
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("No token provided".to_string()))?;

        let tokens = TokenService::from_ref(state);

        // Expired, malformed and wrong-kind tokens are reported identically
        let payload = tokens
            .verify(bearer.token(), TokenType::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;

        Ok(AuthenticatedUser {
            user_id: payload.user_id,
            email: payload.email,
            role: payload.role,
        })
    }
}

/// A set of roles allowed through a [`RequireRole`] gate
pub trait RoleGate: Send + Sync + 'static {
    const ALLOWED: &'static [UserRole];
}

/// Any role
pub struct ViewerAccess;

/// Editors and admins
pub struct EditorAccess;

/// Admins only
pub struct AdminAccess;

impl RoleGate for ViewerAccess {
    const ALLOWED: &'static [UserRole] = &[UserRole::Viewer, UserRole::Editor, UserRole::Admin];
}

impl RoleGate for EditorAccess {
    const ALLOWED: &'static [UserRole] = &[UserRole::Editor, UserRole::Admin];
}

impl RoleGate for AdminAccess {
    const ALLOWED: &'static [UserRole] = &[UserRole::Admin];
}

/// Authenticated user whose role is a member of `G::ALLOWED`
///
/// Rejects with 401 when authentication fails and 403 when the role is not
/// allowed.
pub struct RequireRole<G: RoleGate> {
    pub user: AuthenticatedUser,
    _gate: PhantomData<G>,
}

pub type ViewerUser = RequireRole<ViewerAccess>;
pub type EditorUser = RequireRole<EditorAccess>;
pub type AdminUser = RequireRole<AdminAccess>;

#[async_trait]
impl<S, G> FromRequestParts<S> for RequireRole<G>
where
    TokenService: FromRef<S>,
    S: Send + Sync,
    G: RoleGate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !G::ALLOWED.contains(&user.role) {
            tracing::debug!(
                user_id = %user.user_id,
                email = %user.email,
                role = %user.role,
                "Role not permitted"
            );
            return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
        }

        Ok(RequireRole {
            user,
            _gate: PhantomData,
        })
    }
}
