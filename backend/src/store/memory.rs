//! In-memory stores used when no database is configured, and in tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, PetStore, StoreError};
use crate::models::{NewUser, Pet, PetFilter, PetInput, User, UserRole};

#[derive(Debug)]
struct UserRecord {
    user: User,
    refresh_tokens: Vec<String>,
}

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<Uuid, UserRecord>,
    id_by_email: HashMap<String, Uuid>,
}

/// Credential store backed by a `RwLock<HashMap>`
///
/// Every token-set mutation happens under a single write guard.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<Users>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(
        &self,
        new_user: NewUser,
        initial_refresh_token: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.id_by_email.contains_key(&new_user.email) {
            return Err(StoreError::EmailTaken);
        }

        let now = Utc::now();
        let user = User {
            id: new_user.id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };

        users.id_by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                refresh_tokens: vec![initial_refresh_token.to_string()],
            },
        );

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .id_by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .map(|record| record.user.clone()))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.by_id.get(&user_id).map(|record| record.user.clone()))
    }

    async fn append_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(record) = users.by_id.get_mut(&user_id) {
            record.refresh_tokens.push(token.to_string());
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(record) = users.by_id.get_mut(&user_id) else {
            return Ok(false);
        };

        let Some(position) = record.refresh_tokens.iter().position(|t| t == old) else {
            return Ok(false);
        };

        record.refresh_tokens.remove(position);
        record.refresh_tokens.push(new.to_string());
        Ok(true)
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(record) = users.by_id.get_mut(&user_id) else {
            return Ok(false);
        };

        let before = record.refresh_tokens.len();
        record.refresh_tokens.retain(|t| t != token);
        Ok(record.refresh_tokens.len() != before)
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .by_id
            .get_mut(&user_id)
            .map(|record| record.refresh_tokens.drain(..).count() as u64)
            .unwrap_or(0))
    }

    async fn refresh_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .by_id
            .get(&user_id)
            .map(|record| record.refresh_tokens.clone())
            .unwrap_or_default())
    }

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.by_id.get_mut(&user_id).map(|record| {
            record.user.role = role;
            record.user.updated_at = Utc::now();
            record.user.clone()
        }))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.by_id.remove(&user_id) {
            Some(record) => {
                users.id_by_email.remove(&record.user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Breed catalog backed by a `RwLock<HashMap>`
#[derive(Debug, Default)]
pub struct MemoryPetStore {
    pets: RwLock<HashMap<Uuid, Pet>>,
}

impl MemoryPetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PetStore for MemoryPetStore {
    async fn list(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError> {
        let pets = self.pets.read().await;
        let mut matching: Vec<Pet> = pets
            .values()
            .filter(|pet| filter.pet_type.map_or(true, |t| pet.pet_type == t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Pet>, StoreError> {
        Ok(self.pets.read().await.get(&id).cloned())
    }

    async fn create(&self, input: PetInput) -> Result<Pet, StoreError> {
        let now = Utc::now();
        let pet = Pet {
            id: Uuid::new_v4(),
            name: input.name,
            pet_type: input.pet_type,
            origin: input.origin,
            temperament: input.temperament,
            lifespan: input.lifespan,
            size: input.size,
            is_featured: input.is_featured,
            created_at: now,
            updated_at: now,
        };
        self.pets.write().await.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn update(&self, id: Uuid, input: PetInput) -> Result<Option<Pet>, StoreError> {
        let mut pets = self.pets.write().await;
        Ok(pets.get_mut(&id).map(|pet| {
            pet.name = input.name;
            pet.pet_type = input.pet_type;
            pet.origin = input.origin;
            pet.temperament = input.temperament;
            pet.lifespan = input.lifespan;
            pet.size = input.size;
            pet.is_featured = input.is_featured;
            pet.updated_at = Utc::now();
            pet.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.pets.write().await.remove(&id).is_some())
    }
}
