//! Postgres-backed stores

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, PetStore, StoreError};
use crate::models::{NewUser, Pet, PetFilter, PetInput, User, UserRole};

const SCHEMA: &[&str] = &[
    r#"
    DO $$ BEGIN
        CREATE TYPE user_role AS ENUM ('viewer', 'editor', 'admin');
    EXCEPTION WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    DO $$ BEGIN
        CREATE TYPE pet_type AS ENUM ('dog', 'cat');
    EXCEPTION WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role user_role NOT NULL DEFAULT 'viewer',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id BIGSERIAL PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        token_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, token_hash)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pets (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        pet_type pet_type NOT NULL,
        origin TEXT,
        temperament TEXT,
        lifespan TEXT,
        size TEXT,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Create the tables this service needs if they are missing
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Credential store over the `users` and `refresh_tokens` tables
#[derive(Clone)]
pub struct PgCredentialStore {
    db_pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(
        &self,
        new_user: NewUser,
        initial_refresh_token: &str,
    ) -> Result<User, StoreError> {
        let mut tx = self.db_pool.begin().await?;

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(new_user.id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(user.id)
        .bind(initial_refresh_token)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn append_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut tx = self.db_pool.begin().await?;

        // Concurrent rotations of the same token serialize on this row; the
        // loser sees zero affected rows.
        let removed = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1 AND token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(old)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(new)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1 AND token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.db_pool)
        .await?
        .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        Ok(rows_affected)
    }

    async fn refresh_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let tokens = sqlx::query_scalar(
            r#"
            SELECT token_hash FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(tokens)
    }

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}

/// Breed catalog over the `pets` table
#[derive(Clone)]
pub struct PgPetStore {
    db_pool: PgPool,
}

impl PgPetStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PetStore for PgPetStore {
    async fn list(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError> {
        let pets = sqlx::query_as(
            r#"
            SELECT id, name, pet_type, origin, temperament, lifespan, size, is_featured, created_at, updated_at
            FROM pets
            WHERE ($1::pet_type IS NULL OR pet_type = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(filter.pet_type)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(pets)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Pet>, StoreError> {
        let pet = sqlx::query_as(
            r#"
            SELECT id, name, pet_type, origin, temperament, lifespan, size, is_featured, created_at, updated_at
            FROM pets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(pet)
    }

    async fn create(&self, input: PetInput) -> Result<Pet, StoreError> {
        let pet = sqlx::query_as(
            r#"
            INSERT INTO pets (id, name, pet_type, origin, temperament, lifespan, size, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, pet_type, origin, temperament, lifespan, size, is_featured, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(input.pet_type)
        .bind(&input.origin)
        .bind(&input.temperament)
        .bind(&input.lifespan)
        .bind(&input.size)
        .bind(input.is_featured)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(pet)
    }

    async fn update(&self, id: Uuid, input: PetInput) -> Result<Option<Pet>, StoreError> {
        let pet = sqlx::query_as(
            r#"
            UPDATE pets
            SET name = $2, pet_type = $3, origin = $4, temperament = $5, lifespan = $6,
                size = $7, is_featured = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, pet_type, origin, temperament, lifespan, size, is_featured, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.pet_type)
        .bind(&input.origin)
        .bind(&input.temperament)
        .bind(&input.lifespan)
        .bind(&input.size)
        .bind(input.is_featured)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(pet)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
