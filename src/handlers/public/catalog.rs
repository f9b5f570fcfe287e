// handlers/public/catalog.rs - job offers and trainings shown on the site

use axum::extract::{Query, State};

use crate::database::models::job::{Job, JobQuery};
use crate::database::models::training::{Category, TrainingQuery, TrainingWithCategory};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/jobs?status=&slug=&featured= - newest first
pub async fn jobs(State(state): State<AppState>, Query(query): Query<JobQuery>) -> ApiResult<Vec<Job>> {
    let featured_only = query.featured.as_deref().is_some_and(|f| !f.is_empty() && f != "false");

    let rows: Vec<Job> = sqlx::query_as(
        "SELECT * FROM jobs \
         WHERE ($1::text IS NULL OR status = $1) \
         AND ($2::text IS NULL OR slug = $2) \
         AND (NOT $3 OR featured) \
         ORDER BY created_at DESC",
    )
    .bind(query.status.filter(|s| !s.is_empty()))
    .bind(query.slug.filter(|s| !s.is_empty()))
    .bind(featured_only)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(rows))
}

/// GET /api/trainings?status=&slug= - with the category name
pub async fn trainings(
    State(state): State<AppState>,
    Query(query): Query<TrainingQuery>,
) -> ApiResult<Vec<TrainingWithCategory>> {
    let rows: Vec<TrainingWithCategory> = sqlx::query_as(
        "SELECT t.*, c.name AS category_name FROM trainings t \
         LEFT JOIN categories c ON c.id = t.category_id \
         WHERE ($1::text IS NULL OR t.status = $1) \
         AND ($2::text IS NULL OR t.slug = $2) \
         ORDER BY t.created_at DESC",
    )
    .bind(query.status.filter(|s| !s.is_empty()))
    .bind(query.slug.filter(|s| !s.is_empty()))
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(rows))
}

/// GET /api/trainings/categories
pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let rows: Vec<Category> = sqlx::query_as("SELECT * FROM categories WHERE type = 'formation' ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    Ok(ApiResponse::success(rows))
}
