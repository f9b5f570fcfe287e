use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::PublicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description_html: Option<String>,
    pub contract_type: Option<String>,
    pub location: Option<String>,
    pub domain: Option<String>,
    pub experience: Option<String>,
    pub salary: Option<String>,
    pub status: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JobInput {
    #[validate(length(min = 1, message = "Titre requis"))]
    pub title: String,
    #[validate(length(min = 1, message = "Slug requis"))]
    pub slug: String,
    pub description_html: Option<String>,
    pub contract_type: Option<String>,
    pub location: Option<String>,
    pub domain: Option<String>,
    pub experience: Option<String>,
    pub salary: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub featured: bool,
}

/// `GET /api/jobs` query
#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub status: Option<String>,
    pub slug: Option<String>,
    pub featured: Option<String>,
}
