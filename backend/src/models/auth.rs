//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::UserRole;

/// Public view of a user
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body carrying a refresh token (refresh and logout)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshTokenRequest {
    /// The token, treating an empty string the same as a missing one
    pub fn token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Register/login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

/// GET /auth/me response
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// POST /auth/logout-all response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub success: bool,
    pub revoked_sessions: u64,
}

/// Request to change a user's role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(short.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_refresh_request_treats_blank_as_missing() {
        let req: RefreshTokenRequest = serde_json::from_str(r#"{"refreshToken":"  "}"#).unwrap();
        assert_eq!(req.token(), None);

        let req: RefreshTokenRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.token(), None);

        let req: RefreshTokenRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.token(), Some("abc"));
    }
}
