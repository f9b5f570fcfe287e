// handlers/protected/cra.rs - monthly activity reports
//
// Admins see and edit every report. Consultants see their own reports and
// edit them only while they are drafts.

use axum::{
    extract::{Path, State},
    Extension,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::cra::{
    CraDayDetail, CraReport, CraReportView, CraStatus, CreateCraRequest, DayInput, SendValidationRequest,
    UpdateCraRequest,
};
use crate::database::models::non_empty;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, ValidatedJson};
use crate::services::cra_validation::{self, REPORT_VIEW};
use crate::state::AppState;

const NOT_FOUND: &str = "CRA introuvable";

/// Owner and status of a report the caller may see
async fn visible_report(state: &AppState, user: &AuthUser, id: Uuid) -> Result<(Uuid, String), ApiError> {
    let row: Option<(Uuid, String)> = sqlx::query_as("SELECT user_id, status FROM cra_reports WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match row {
        Some((owner, status)) if user.owns(owner) => Ok((owner, status)),
        _ => Err(ApiError::not_found(NOT_FOUND)),
    }
}

/// GET /api/cra - newest first
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<CraReportView>> {
    let rows: Vec<CraReportView> = if user.is_admin() {
        sqlx::query_as(&format!("{} ORDER BY r.created_at DESC", REPORT_VIEW))
            .fetch_all(&state.pool)
            .await?
    } else {
        sqlx::query_as(&format!("{} WHERE r.user_id = $1 ORDER BY r.created_at DESC", REPORT_VIEW))
            .bind(user.id)
            .fetch_all(&state.pool)
            .await?
    };
    Ok(ApiResponse::success(rows))
}

/// GET /api/cra/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<CraReportView> {
    let row: Option<CraReportView> = sqlx::query_as(&format!("{} WHERE r.id = $1", REPORT_VIEW))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match row {
        Some(report) if user.owns(report.report.user_id) => Ok(ApiResponse::success(report)),
        _ => Err(ApiError::not_found(NOT_FOUND)),
    }
}

/**
 * POST /api/cra - new draft for the caller
 *
 * One report per (user, month, client). The pre-check gives the friendly
 * message; the unique index catches a concurrent insert.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<CreateCraRequest>,
) -> ApiResult<CraReport> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM cra_reports \
         WHERE user_id = $1 AND month = $2 AND client_id IS NOT DISTINCT FROM $3)",
    )
    .bind(user.id)
    .bind(&request.month)
    .bind(request.client_id)
    .fetch_one(&state.pool)
    .await?;
    if exists {
        return Err(ApiError::conflict("Un CRA existe déjà pour ce mois"));
    }

    let report: CraReport = sqlx::query_as(
        "INSERT INTO cra_reports \
         (user_id, month, client_id, company_name, worked_days, absent_days, monthly_comment, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft') RETURNING *",
    )
    .bind(user.id)
    .bind(&request.month)
    .bind(request.client_id)
    .bind(non_empty(request.company_name))
    .bind(request.worked_days.unwrap_or(Decimal::ZERO))
    .bind(request.absent_days.unwrap_or(Decimal::ZERO))
    .bind(non_empty(request.monthly_comment))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::conflict("Un CRA existe déjà pour ce mois"),
        other => other,
    })?;

    tracing::info!("CRA {} created for {} by {}", report.id, report.month, user.id);
    Ok(ApiResponse::created(report))
}

/// PUT /api/cra/:id - admins may also set `status` and `admin_comment`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateCraRequest>,
) -> ApiResult<Value> {
    let updated = if user.is_admin() {
        sqlx::query(
            "UPDATE cra_reports SET client_id = $1, company_name = $2, \
             worked_days = COALESCE($3, worked_days), absent_days = COALESCE($4, absent_days), \
             monthly_comment = $5, status = COALESCE($6, status), admin_comment = $7, \
             updated_at = NOW() WHERE id = $8",
        )
        .bind(request.client_id)
        .bind(non_empty(request.company_name))
        .bind(request.worked_days)
        .bind(request.absent_days)
        .bind(non_empty(request.monthly_comment))
        .bind(request.status.map(|s| s.as_str()))
        .bind(non_empty(request.admin_comment))
        .bind(id)
        .execute(&state.pool)
        .await?
    } else {
        sqlx::query(
            "UPDATE cra_reports SET client_id = $1, company_name = $2, \
             worked_days = COALESCE($3, worked_days), absent_days = COALESCE($4, absent_days), \
             monthly_comment = $5, updated_at = NOW() \
             WHERE id = $6 AND user_id = $7 AND status = 'draft'",
        )
        .bind(request.client_id)
        .bind(non_empty(request.company_name))
        .bind(request.worked_days)
        .bind(request.absent_days)
        .bind(non_empty(request.monthly_comment))
        .bind(id)
        .bind(user.id)
        .execute(&state.pool)
        .await?
    }
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    Ok(ApiResponse::done())
}

/// PUT /api/cra/:id/submit - draft to submitted, own reports only
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let updated = sqlx::query(
        "UPDATE cra_reports SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND user_id = $3 AND status = $4",
    )
    .bind(CraStatus::Submitted.as_str())
    .bind(id)
    .bind(user.id)
    .bind(CraStatus::Draft.as_str())
    .execute(&state.pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    tracing::info!("CRA {} submitted by {}", id, user.id);
    Ok(ApiResponse::done())
}

/// DELETE /api/cra/:id - admins any report, consultants their drafts
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let deleted = if user.is_admin() {
        sqlx::query("DELETE FROM cra_reports WHERE id = $1")
            .bind(id)
            .execute(&state.pool)
            .await?
    } else {
        sqlx::query("DELETE FROM cra_reports WHERE id = $1 AND user_id = $2 AND status = 'draft'")
            .bind(id)
            .bind(user.id)
            .execute(&state.pool)
            .await?
    }
    .rows_affected();

    if deleted == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    tracing::info!("CRA {} deleted by {}", id, user.id);
    Ok(ApiResponse::done())
}

/// GET /api/cra/:id/days - ordered by date
pub async fn days(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<CraDayDetail>> {
    visible_report(&state, &user, id).await?;

    let rows: Vec<CraDayDetail> =
        sqlx::query_as("SELECT * FROM cra_day_details WHERE cra_report_id = $1 ORDER BY date")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/cra/:id/days - replace the whole day list in one transaction
pub async fn replace_days(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    JsonBody(days): JsonBody<Value>,
) -> ApiResult<Value> {
    if !days.is_array() {
        return Err(ApiError::bad_request("Array de jours requis"));
    }
    let days: Vec<DayInput> =
        serde_json::from_value(days).map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let (_, status) = visible_report(&state, &user, id).await?;
    if !user.is_admin() && status != CraStatus::Draft.as_str() {
        return Err(ApiError::forbidden("CRA non modifiable"));
    }

    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM cra_day_details WHERE cra_report_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for day in &days {
        sqlx::query("INSERT INTO cra_day_details (cra_report_id, date, state, comment) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(day.date)
            .bind(day.state.as_str())
            .bind(non_empty(day.comment.clone()))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::debug!("CRA {} now has {} day rows", id, days.len());
    Ok(ApiResponse::done())
}

/// POST /api/cra/send-validation - `{craId, clientEmail}`
pub async fn send_validation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<SendValidationRequest>,
) -> ApiResult<Value> {
    cra_validation::send_validation(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        &user,
        request.cra_id,
        request.client_email.trim(),
    )
    .await?;
    Ok(ApiResponse::success(json!({ "message": "Email de validation envoyé" })))
}
