//! Breed catalog models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Species a breed belongs to
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "pet_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
}

/// Breed record
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: Species,
    pub origin: Option<String>,
    pub temperament: Option<String>,
    pub lifespan: Option<String>,
    pub size: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body for a breed
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PetInput {
    #[validate(length(min = 1, message = "Pet name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: Species,
    pub origin: Option<String>,
    pub temperament: Option<String>,
    pub lifespan: Option<String>,
    pub size: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl PetInput {
    /// Trim the name so whitespace-only names fail validation
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Query parameters for listing breeds
#[derive(Debug, Deserialize, Default)]
pub struct PetFilter {
    #[serde(rename = "type")]
    pub pet_type: Option<Species>,
}

/// List response
#[derive(Debug, Serialize)]
pub struct PetsResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Pet>,
}

/// Single-record response
#[derive(Debug, Serialize)]
pub struct PetResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Pet,
}
