//! JWT token generation and validation
//!
//! Access and refresh tokens are signed with independent secrets, so a leaked
//! access secret cannot mint refresh tokens and vice versa. Verification is
//! a pure function of the secret and the token; no store is consulted.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{User, UserRole};

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims shared by both token kinds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Unique per token, so two tokens minted in the same second differ
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    pub token_type: TokenType,
}

/// Identity embedded in every token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for TokenPayload {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Mints and verifies access/refresh tokens
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_access_secret,
            &config.jwt_refresh_secret,
            Duration::seconds(config.jwt_access_token_ttl_seconds),
            Duration::days(config.jwt_refresh_token_ttl_days),
        )
    }

    /// Generate a short-lived access token
    pub fn issue_access_token(&self, payload: &TokenPayload) -> Result<String, JwtError> {
        self.issue(payload, TokenType::Access)
    }

    /// Generate a long-lived refresh token
    pub fn issue_refresh_token(&self, payload: &TokenPayload) -> Result<String, JwtError> {
        self.issue(payload, TokenType::Refresh)
    }

    fn issue(&self, payload: &TokenPayload, token_type: TokenType) -> Result<String, JwtError> {
        let (key, ttl) = match token_type {
            TokenType::Access => (&self.access_encoding, self.access_ttl),
            TokenType::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };

        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            JwtError::EncodingFailed(format!(
                "{} token lifetime out of range",
                token_type.as_str()
            ))
        })?;
        let claims = Claims {
            sub: payload.user_id.to_string(),
            email: payload.email.clone(),
            role: payload.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token of the given kind and recover its payload
    ///
    /// Checks signature (with the secret for `kind`), expiry with no leeway,
    /// and that the token was minted as `kind`.
    pub fn verify(&self, token: &str, kind: TokenType) -> Result<TokenPayload, JwtError> {
        let key = match kind {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken(e.to_string()),
            })?
            .claims;

        if claims.token_type != kind {
            return Err(JwtError::InvalidToken(format!(
                "expected {} token",
                kind.as_str()
            )));
        }

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))?;

        Ok(TokenPayload {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}
