// handlers/public/submissions.rs - forms posted from the public site

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::database::models::content::{ApplicationInput, ContactInput, TrainingLeadInput};
use crate::database::models::non_empty;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::state::AppState;

/// POST /api/applications - job application, answers `{id}`
pub async fn application(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ApplicationInput>,
) -> ApiResult<Value> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO applications (job_id, name, email, phone, message, cv_url) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(input.job_id)
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(non_empty(input.phone))
    .bind(non_empty(input.message))
    .bind(non_empty(input.cv_url))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Application {} received", id);
    Ok(ApiResponse::created(json!({ "id": id })))
}

/// POST /api/training-leads - training information request
pub async fn training_lead(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<TrainingLeadInput>,
) -> ApiResult<Value> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO training_leads (training_id, name, email, phone, company, message) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(input.training_id)
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(non_empty(input.phone))
    .bind(non_empty(input.company))
    .bind(non_empty(input.message))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Training lead {} received", id);
    Ok(ApiResponse::created(json!({ "id": id })))
}

/// POST /api/contact
pub async fn contact(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ContactInput>,
) -> ApiResult<Value> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO contact_messages (name, email, phone, subject, message) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(non_empty(input.phone))
    .bind(non_empty(input.subject))
    .bind(&input.message)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Contact message {} received", id);
    Ok(ApiResponse::created(json!({ "id": id })))
}

/// Keep `[a-zA-Z0-9._-]`, replace anything else with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

pub fn cv_dir(upload_dir: &str) -> PathBuf {
    Path::new(upload_dir).join("cvs")
}

/**
 * POST /api/upload - CV attached to an application
 *
 * Multipart with a single `file` field, streamed to
 * `<upload_dir>/cvs/<epoch-millis>-<sanitized name>`. Files above the
 * configured cap are removed and answered with 413.
 */
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Value> {
    let max_bytes = state.config.api.upload_max_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or("cv").to_string();
        let filename = format!("{}-{}", chrono::Utc::now().timestamp_millis(), sanitize_filename(&original));
        let dir = cv_dir(&state.config.api.upload_dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&filename);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut written = 0usize;
        while let Some(chunk) = field.chunk().await? {
            written += chunk.len();
            if written > max_bytes {
                drop(file);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::error!("Failed to remove oversized upload {}: {}", path.display(), e);
                }
                return Err(ApiError::payload_too_large("Fichier trop volumineux"));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!("Stored upload {} ({} bytes)", filename, written);
        return Ok(ApiResponse::created(json!({ "path": filename })));
    }

    Err(ApiError::bad_request("Aucun fichier"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("CV Jean (2024).pdf"), "CV_Jean__2024_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("cv-final_v2.pdf"), "cv-final_v2.pdf");
    }
}
