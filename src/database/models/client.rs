use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientInput {
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientValidator {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidatorInput {
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub mission_name: Option<String>,
    pub default_validator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AssignmentView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub assignment: Assignment,
    pub client_name: String,
    pub validator_name: Option<String>,
    pub validator_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentInput {
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub mission_name: Option<String>,
    pub default_validator_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentQuery {
    pub user_id: Option<Uuid>,
}
