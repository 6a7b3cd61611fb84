//! Authentication service
//!
//! Core business logic for email/password authentication with rotating
//! refresh tokens.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::models::{NewUser, User, UserRole};
use crate::store::{CredentialStore, StoreError};

use super::jwt::{JwtError, TokenPayload, TokenService, TokenType};
use super::password::{hash_password, verify_password, PasswordError};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Signature, expiry or token-kind failure. Deliberately carries no detail.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The refresh token verified but is no longer in the user's set
    #[error("Invalid refresh token")]
    RefreshTokenRevoked,

    #[error("User not found")]
    UserNotFound,

    #[error("Token error: {0}")]
    TokenIssue(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::EncodingFailed(msg) => AuthError::TokenIssue(msg),
            JwtError::TokenExpired | JwtError::InvalidToken(_) => AuthError::InvalidToken,
        }
    }
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of register/login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: IssuedTokens,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    bcrypt_cost: u32,
    /// Hashed at the configured cost; unknown-email logins verify against it
    unknown_user_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
            unknown_user_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create an account with the lowest-privilege role and sign it in
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let payload = TokenPayload {
            user_id: Uuid::new_v4(),
            email: email.clone(),
            role: UserRole::default(),
        };
        let tokens = self.issue_pair(&payload)?;

        let user = self
            .store
            .create_user(
                NewUser {
                    id: payload.user_id,
                    email,
                    password_hash,
                    role: payload.role,
                },
                &hash_token(&tokens.refresh_token),
            )
            .await
            .map_err(|e| match e {
                StoreError::EmailTaken => AuthError::EmailTaken,
                other => AuthError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(AuthSession { user, tokens })
    }

    /// Check credentials and issue a new token pair
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_by_email(&email).await? else {
            // Spend the same bcrypt work as a real mismatch.
            let hash = self
                .unknown_user_hash
                .get_or_try_init(|| hash_password("unknown-user", self.bcrypt_cost))
                .await?;
            verify_password(password, hash).await?;
            tracing::debug!("Login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&TokenPayload::from(&user))?;
        self.store
            .append_refresh_token(user.id, &hash_token(&tokens.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthSession { user, tokens })
    }

    /// Exchange a refresh token for a new pair, rotating it out
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<IssuedTokens, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;

        let user = self
            .store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Role and email come from the stored record so promotions take
        // effect on the next refresh.
        let tokens = self.issue_pair(&TokenPayload::from(&user))?;

        let rotated = self
            .store
            .rotate_refresh_token(
                user.id,
                &hash_token(refresh_token),
                &hash_token(&tokens.refresh_token),
            )
            .await?;

        if !rotated {
            tracing::warn!(user_id = %user.id, "Refresh token replayed or revoked");
            return Err(AuthError::RefreshTokenRevoked);
        }

        tracing::debug!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Revoke one refresh token. Never fails on a bad or unknown token.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = match self.tokens.verify(refresh_token, TokenType::Refresh) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Logout with unusable refresh token");
                return Ok(());
            }
        };

        let removed = self
            .store
            .remove_refresh_token(claims.user_id, &hash_token(refresh_token))
            .await?;

        tracing::info!(user_id = %claims.user_id, removed, "User logged out");
        Ok(())
    }

    /// Revoke every refresh token of a user
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.store.clear_refresh_tokens(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change a user's role. Existing access tokens keep the old role until
    /// they expire.
    pub async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<User, AuthError> {
        let user = self
            .store
            .update_role(user_id, role)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        tracing::info!(user_id = %user_id, role = %role, "User role changed");
        Ok(user)
    }

    /// Delete an account, invalidating all of its refresh tokens
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        if !self.store.delete_user(user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Token service (for middleware access)
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn issue_pair(&self, payload: &TokenPayload) -> Result<IssuedTokens, AuthError> {
        Ok(IssuedTokens {
            access_token: self.tokens.issue_access_token(payload)?,
            refresh_token: self.tokens.issue_refresh_token(payload)?,
        })
    }
}

/// Emails are unique case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use chrono::Duration;

    fn test_service() -> (AuthService, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let tokens = TokenService::new(
            "access-secret",
            "refresh-secret",
            Duration::minutes(15),
            Duration::days(7),
        );
        (AuthService::new(store.clone(), tokens, 4), store)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _) = test_service();

        let registered = service.register("a@x.com", "secret1").await.unwrap();
        assert_eq!(registered.user.role, UserRole::Viewer);
        assert_ne!(registered.user.password_hash, "secret1");

        let session = service.login("a@x.com", "secret1").await.unwrap();
        let claims = service
            .tokens()
            .verify(&session.tokens.access_token, TokenType::Access)
            .unwrap();
        assert_eq!(claims.user_id, registered.user.id);
        assert_eq!(claims.role, UserRole::Viewer);
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_rejects_duplicates() {
        let (service, _) = test_service();

        let session = service.register("  Mixed@Case.COM ", "secret1").await.unwrap();
        assert_eq!(session.user.email, "mixed@case.com");

        let duplicate = service.register("MIXED@case.com", "secret2").await;
        assert!(matches!(duplicate, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = test_service();
        service.register("a@x.com", "secret1").await.unwrap();

        let wrong_password = service.login("a@x.com", "wrong").await.unwrap_err();
        let unknown_user = service.login("b@x.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_unknown_email_still_runs_bcrypt() {
        let (service, _) = test_service();
        assert!(service.unknown_user_hash.get().is_none());

        let err = service.login("nobody@x.com", "unknown-user").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let hash = service.unknown_user_hash.get().unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("unknown-user", hash).await.unwrap());

        // The hash is computed once and reused
        let first = hash.clone();
        service.login("other@x.com", "whatever").await.unwrap_err();
        assert_eq!(service.unknown_user_hash.get().unwrap(), &first);
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let (service, _) = test_service();
        let session = service.register("a@x.com", "secret1").await.unwrap();
        let original = session.tokens.refresh_token;

        let rotated = service.refresh_tokens(&original).await.unwrap();
        assert_ne!(rotated.refresh_token, original);

        let replay = service.refresh_tokens(&original).await;
        assert!(matches!(replay, Err(AuthError::RefreshTokenRevoked)));

        // The replacement still works
        service.refresh_tokens(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _) = test_service();
        let session = service.register("a@x.com", "secret1").await.unwrap();

        let result = service.refresh_tokens(&session.tokens.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let (service, _) = test_service();
        let session = service.register("a@x.com", "secret1").await.unwrap();
        service.delete_user(session.user.id).await.unwrap();

        let result = service.refresh_tokens(&session.tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (service, store) = test_service();
        let first = service.register("a@x.com", "secret1").await.unwrap();
        let second = service.login("a@x.com", "secret1").await.unwrap();

        service.logout(&first.tokens.refresh_token).await.unwrap();
        let after_first = store.refresh_tokens(first.user.id).await.unwrap();
        assert_eq!(after_first.len(), 1);

        service.logout(&first.tokens.refresh_token).await.unwrap();
        assert_eq!(store.refresh_tokens(first.user.id).await.unwrap(), after_first);

        service.logout("garbage").await.unwrap();

        // Logged-out token can no longer refresh; the other session can.
        assert!(service
            .refresh_tokens(&first.tokens.refresh_token)
            .await
            .is_err());
        service
            .refresh_tokens(&second.tokens.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_logout_all_revokes_every_session() {
        let (service, _) = test_service();
        let first = service.register("a@x.com", "secret1").await.unwrap();
        let second = service.login("a@x.com", "secret1").await.unwrap();

        assert_eq!(service.logout_all(first.user.id).await.unwrap(), 2);
        assert!(service
            .refresh_tokens(&first.tokens.refresh_token)
            .await
            .is_err());
        assert!(service
            .refresh_tokens(&second.tokens.refresh_token)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_promotion_reaches_refreshed_tokens() {
        let (service, _) = test_service();
        let session = service.register("a@x.com", "secret1").await.unwrap();
        service
            .set_role(session.user.id, UserRole::Editor)
            .await
            .unwrap();

        let refreshed = service
            .refresh_tokens(&session.tokens.refresh_token)
            .await
            .unwrap();
        let claims = service
            .tokens()
            .verify(&refreshed.access_token, TokenType::Access)
            .unwrap();
        assert_eq!(claims.role, UserRole::Editor);
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("abc"));
        assert_ne!(digest, hash_token("abd"));
    }
}
