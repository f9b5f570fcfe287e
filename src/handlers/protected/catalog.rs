// handlers/protected/catalog.rs - back-office edits of jobs and trainings
//
// Rich-text fields arrive as HTML from the editor and are passed through
// ammonia before storage.

use axum::extract::{Path, State};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::job::JobInput;
use crate::database::models::non_empty;
use crate::database::models::training::TrainingInput;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::state::AppState;

fn clean_html(html: Option<String>) -> Option<String> {
    non_empty(html).map(|h| ammonia::clean(&h))
}

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<JobInput>,
) -> ApiResult<Value> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO jobs (title, slug, description_html, contract_type, location, domain, \
         experience, salary, status, featured) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(input.title.trim())
    .bind(input.slug.trim())
    .bind(clean_html(input.description_html))
    .bind(non_empty(input.contract_type))
    .bind(non_empty(input.location))
    .bind(non_empty(input.domain))
    .bind(non_empty(input.experience))
    .bind(non_empty(input.salary))
    .bind(input.status.as_str())
    .bind(input.featured)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Job {} created", id);
    Ok(ApiResponse::created(json!({ "id": id })))
}

/// PUT /api/jobs/:id - full replacement of the editable fields
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<JobInput>,
) -> ApiResult<Value> {
    let updated = sqlx::query(
        "UPDATE jobs SET title = $1, slug = $2, description_html = $3, contract_type = $4, \
         location = $5, domain = $6, experience = $7, salary = $8, status = $9, featured = $10, \
         updated_at = NOW() WHERE id = $11",
    )
    .bind(input.title.trim())
    .bind(input.slug.trim())
    .bind(clean_html(input.description_html))
    .bind(non_empty(input.contract_type))
    .bind(non_empty(input.location))
    .bind(non_empty(input.domain))
    .bind(non_empty(input.experience))
    .bind(non_empty(input.salary))
    .bind(input.status.as_str())
    .bind(input.featured)
    .bind(id)
    .execute(&state.pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found("Offre introuvable"));
    }
    Ok(ApiResponse::done())
}

/// DELETE /api/jobs/:id
pub async fn delete_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let deleted = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Offre introuvable"));
    }
    tracing::info!("Job {} deleted", id);
    Ok(ApiResponse::done())
}

/// POST /api/trainings - `published_at` is stamped when created as published
pub async fn create_training(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<TrainingInput>,
) -> ApiResult<Value> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO trainings (title, slug, modality, category_id, duration_hours, price, \
         description_html, goals_html, program_html, prerequisites_html, audience_html, \
         status, featured, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
         CASE WHEN $12 = 'published' THEN NOW() ELSE NULL END) RETURNING id",
    )
    .bind(input.title.trim())
    .bind(input.slug.trim())
    .bind(input.modality.map(|m| m.as_str()))
    .bind(input.category_id)
    .bind(input.duration_hours)
    .bind(input.price)
    .bind(clean_html(input.description_html))
    .bind(clean_html(input.goals_html))
    .bind(clean_html(input.program_html))
    .bind(clean_html(input.prerequisites_html))
    .bind(clean_html(input.audience_html))
    .bind(input.status.as_str())
    .bind(input.featured)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Training {} created", id);
    Ok(ApiResponse::created(json!({ "id": id })))
}

/// PUT /api/trainings/:id - keeps the first publication date while published
pub async fn update_training(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<TrainingInput>,
) -> ApiResult<Value> {
    let updated = sqlx::query(
        "UPDATE trainings SET title = $1, slug = $2, modality = $3, category_id = $4, \
         duration_hours = $5, price = $6, description_html = $7, goals_html = $8, \
         program_html = $9, prerequisites_html = $10, audience_html = $11, status = $12, \
         featured = $13, \
         published_at = CASE WHEN $12 = 'published' THEN COALESCE(published_at, NOW()) ELSE NULL END, \
         updated_at = NOW() WHERE id = $14",
    )
    .bind(input.title.trim())
    .bind(input.slug.trim())
    .bind(input.modality.map(|m| m.as_str()))
    .bind(input.category_id)
    .bind(input.duration_hours)
    .bind(input.price)
    .bind(clean_html(input.description_html))
    .bind(clean_html(input.goals_html))
    .bind(clean_html(input.program_html))
    .bind(clean_html(input.prerequisites_html))
    .bind(clean_html(input.audience_html))
    .bind(input.status.as_str())
    .bind(input.featured)
    .bind(id)
    .execute(&state.pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found("Formation introuvable"));
    }
    Ok(ApiResponse::done())
}

/// DELETE /api/trainings/:id
pub async fn delete_training(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let deleted = sqlx::query("DELETE FROM trainings WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Formation introuvable"));
    }
    tracing::info!("Training {} deleted", id);
    Ok(ApiResponse::done())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_stripped_from_rich_text() {
        let cleaned = clean_html(Some("<p>Poste</p><script>alert(1)</script>".to_string())).unwrap();
        assert_eq!(cleaned, "<p>Poste</p>");
        assert_eq!(clean_html(Some("  ".to_string())), None);
    }
}
