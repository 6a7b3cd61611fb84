//! Persistence seams
//!
//! The auth subsystem only talks to storage through [`CredentialStore`]; the
//! breed catalog through [`PetStore`]. Both have a Postgres implementation for
//! deployments and an in-memory one for development and tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, Pet, PetFilter, PetInput, User, UserRole};

mod memory;
mod postgres;

pub use memory::{MemoryCredentialStore, MemoryPetStore};
pub use postgres::{ensure_schema, PgCredentialStore, PgPetStore};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let email_taken = err
            .as_database_error()
            .map(|db| {
                db.code().as_deref() == Some("23505") && db.constraint() == Some("users_email_key")
            })
            .unwrap_or(false);

        if email_taken {
            StoreError::EmailTaken
        } else {
            StoreError::Database(err.to_string())
        }
    }
}

/// User identities and their refresh-token sets
///
/// Refresh tokens are handled as opaque digests; callers hash before calling.
/// Every method that changes a token set does so in one persisted update.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user holding `initial_refresh_token` as its only token.
    /// Fails with [`StoreError::EmailTaken`] if the email is already present.
    async fn create_user(
        &self,
        new_user: NewUser,
        initial_refresh_token: &str,
    ) -> Result<User, StoreError>;

    /// Lookup by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Append a token to the user's set
    async fn append_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError>;

    /// Remove `old` and append `new` atomically.
    ///
    /// Returns `false`, changing nothing, when `old` is not in the set.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, StoreError>;

    /// Remove one token; `false` if it was not present
    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError>;

    /// Remove every token of the user, returning how many were removed
    async fn clear_refresh_tokens(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// The user's current token set, oldest first
    async fn refresh_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<Option<User>, StoreError>;

    /// Delete the user together with all of its refresh tokens
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Breed records
#[async_trait]
pub trait PetStore: Send + Sync {
    /// All breeds matching `filter`, sorted by name
    async fn list(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Pet>, StoreError>;

    async fn create(&self, input: PetInput) -> Result<Pet, StoreError>;

    async fn update(&self, id: Uuid, input: PetInput) -> Result<Option<Pet>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
