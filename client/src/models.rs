//! Wire types shared with the API server

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access/refresh pair persisted between requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Viewer,
    Editor,
    Admin,
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<RefreshResponse> for TokenPair {
    fn from(res: RefreshResponse) -> Self {
        TokenPair {
            access_token: res.access_token,
            refresh_token: res.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub success: bool,
    pub user: User,
}

/// Error body returned by the server for non-2xx responses
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_response_from_server_shape() {
        let body = json!({
            "success": true,
            "user": {
                "id": "6f1c1f8e-6a1b-4a0e-9a57-0e6c1b1f3c11",
                "email": "a@x.com",
                "role": "viewer"
            },
            "accessToken": "access",
            "refreshToken": "refresh"
        });

        let res: AuthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(res.user.role, UserRole::Viewer);
        assert!(res.user.created_at.is_none());
        assert_eq!(
            res.tokens(),
            TokenPair {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            }
        );
    }
}
