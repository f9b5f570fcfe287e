use axum::{extract::State, Extension};

use crate::database::models::user::SessionUser;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::accounts;
use crate::state::AppState;

/// GET /api/auth/me - identity and roles as currently stored, not as signed
pub async fn me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<SessionUser> {
    let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?;
    let email = email.ok_or_else(|| ApiError::not_found("Utilisateur introuvable"))?;

    let roles = accounts::load_roles(&state.pool, user.id).await?;
    Ok(ApiResponse::success(accounts::session_user(user.id, email, roles)))
}
