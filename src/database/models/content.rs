use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub cv_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationWithJob {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub job_title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplicationInput {
    pub job_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub cv_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingLead {
    pub id: Uuid,
    pub training_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingLeadWithTraining {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lead: TrainingLead,
    pub training_title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrainingLeadInput {
    pub training_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactInput {
    #[validate(length(min = 1, message = "Nom requis"))]
    pub name: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "Message requis"))]
    pub message: String,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub jobs: i64,
    pub trainings: i64,
    pub applications: i64,
    pub training_leads: i64,
    pub pending_cra: i64,
}
