use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::PublicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Training {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub modality: Option<String>,
    pub category_id: Option<Uuid>,
    pub duration_hours: Option<i32>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub description_html: Option<String>,
    pub goals_html: Option<String>,
    pub program_html: Option<String>,
    pub prerequisites_html: Option<String>,
    pub audience_html: Option<String>,
    pub status: String,
    pub featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub training: Training,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Presentiel,
    Distanciel,
    Hybride,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Presentiel => "presentiel",
            Modality::Distanciel => "distanciel",
            Modality::Hybride => "hybride",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrainingInput {
    #[validate(length(min = 1, message = "Titre requis"))]
    pub title: String,
    #[validate(length(min = 1, message = "Slug requis"))]
    pub slug: String,
    pub modality: Option<Modality>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Durée invalide"))]
    pub duration_hours: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub description_html: Option<String>,
    pub goals_html: Option<String>,
    pub program_html: Option<String>,
    pub prerequisites_html: Option<String>,
    pub audience_html: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrainingQuery {
    pub status: Option<String>,
    pub slug: Option<String>,
}
