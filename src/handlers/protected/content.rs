// handlers/protected/content.rs - admin inbox: applications, leads, messages

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::Response,
};
use sqlx::PgPool;

use crate::database::models::content::{ApplicationWithJob, ContactMessage, Stats, TrainingLeadWithTraining};
use crate::error::ApiError;
use crate::handlers::public::submissions::{cv_dir, sanitize_filename};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/applications - with the job title, newest first
pub async fn applications(State(state): State<AppState>) -> ApiResult<Vec<ApplicationWithJob>> {
    let rows: Vec<ApplicationWithJob> = sqlx::query_as(
        "SELECT a.*, j.title AS job_title FROM applications a \
         LEFT JOIN jobs j ON j.id = a.job_id \
         ORDER BY a.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/training-leads - with the training title, newest first
pub async fn training_leads(State(state): State<AppState>) -> ApiResult<Vec<TrainingLeadWithTraining>> {
    let rows: Vec<TrainingLeadWithTraining> = sqlx::query_as(
        "SELECT l.*, t.title AS training_title FROM training_leads l \
         LEFT JOIN trainings t ON t.id = l.training_id \
         ORDER BY l.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/contact
pub async fn contact_messages(State(state): State<AppState>) -> ApiResult<Vec<ContactMessage>> {
    let rows: Vec<ContactMessage> = sqlx::query_as("SELECT * FROM contact_messages ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;
    Ok(ApiResponse::success(rows))
}

async fn count(pool: &PgPool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql).fetch_one(pool).await
}

/// GET /api/stats - dashboard counters
pub async fn stats(State(state): State<AppState>) -> ApiResult<Stats> {
    let pool = &state.pool;
    let (jobs, trainings, applications, training_leads, pending_cra) = tokio::try_join!(
        count(pool, "SELECT COUNT(*) FROM jobs"),
        count(pool, "SELECT COUNT(*) FROM trainings"),
        count(pool, "SELECT COUNT(*) FROM applications"),
        count(pool, "SELECT COUNT(*) FROM training_leads"),
        count(pool, "SELECT COUNT(*) FROM cra_reports WHERE status = 'submitted'"),
    )?;

    Ok(ApiResponse::success(Stats {
        jobs,
        trainings,
        applications,
        training_leads,
        pending_cra,
    }))
}

fn content_type(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// GET /api/uploads/cvs/:filename - stored CV, served as an attachment
pub async fn download_cv(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response, ApiError> {
    let safe = sanitize_filename(&filename);
    if safe.is_empty() || safe.starts_with('.') {
        return Err(ApiError::not_found("Fichier introuvable"));
    }

    let path = cv_dir(&state.config.api.upload_dir).join(&safe);
    let bytes = tokio::fs::read(&path).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .map_err(|_| ApiError::not_found("Fichier introuvable"))?;
    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type(&safe))
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal_server_error("Erreur serveur")
        })?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("1700000000000-cv.PDF"), "application/pdf");
        assert_eq!(content_type("cv.docx"), content_type("x.docx"));
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
