use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::types::Role;

/// Credential row; never serialized
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub encrypted_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin listing row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserWithRoles {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

/// Identity returned by login, signup and `/me`
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email et mot de passe requis"))]
    pub email: String,
    #[validate(length(min = 1, message = "Email et mot de passe requis"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupMetadata {
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    #[validate(length(min = 6, message = "Mot de passe trop court"))]
    pub password: String,
    #[serde(default)]
    pub metadata: Option<SignupMetadata>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    #[validate(length(min = 6, message = "Mot de passe trop court"))]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}
