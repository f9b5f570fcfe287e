// handlers/public/auth.rs - token acquisition and password recovery

use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::database::models::token::{ResetPasswordConfirmRequest, ResetPasswordRequest};
use crate::database::models::user::{LoginRequest, SignupRequest, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::{accounts, password_reset};
use crate::state::AppState;

/**
 * POST /api/auth/login - exchange credentials for a session JWT
 *
 * Input: `{ "email": "...", "password": "..." }`
 * Output: `{ "token": "...", "user": { id, email, role, roles } }`
 *
 * The email match is case-insensitive. Unknown email and wrong password get
 * the same 401 so the endpoint does not reveal which accounts exist.
 */
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Value> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(request.email.trim())
        .fetch_optional(&state.pool)
        .await?;

    let Some(user) = user else {
        tracing::warn!("Login failed: unknown email");
        return Err(ApiError::unauthorized("Identifiants invalides"));
    };
    if !verify_password(&request.password, &user.encrypted_password).await? {
        tracing::warn!("Login failed for user {}", user.id);
        return Err(ApiError::unauthorized("Identifiants invalides"));
    }

    let roles = accounts::load_roles(&state.pool, user.id).await?;
    let claims = Claims::new(
        user.id,
        user.email.clone(),
        roles.clone(),
        state.config.security.jwt_expiry_hours,
    );
    let token = generate_jwt(&claims, &state.config.security.jwt_secret)?;

    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::success(json!({
        "token": token,
        "user": accounts::session_user(user.id, user.email, roles),
    })))
}

/// POST /api/auth/signup - self-service account with a profile and no role
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> ApiResult<Value> {
    let email = request.email.trim().to_string();
    let full_name = request.metadata.and_then(|m| m.full_name);
    let hashed = hash_password(&request.password, state.config.security.bcrypt_cost).await?;

    let mut tx = state.pool.begin().await?;
    let user_id =
        accounts::create_account(&mut tx, &email, &hashed, full_name.as_deref(), "Cet email est déjà utilisé")
            .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(json!({
        "user": accounts::session_user(user_id, email, Vec::new()),
    })))
}

/// POST /api/auth/logout - sessions are stateless; the client drops its token
pub async fn logout() -> ApiResult<Value> {
    Ok(ApiResponse::done())
}

/// POST /api/auth/reset-password - always answers success
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Value> {
    password_reset::request_reset(&state.pool, state.mailer.as_ref(), &state.config, request.email.trim()).await?;
    Ok(ApiResponse::done())
}

/// POST /api/auth/reset-password-confirm
pub async fn reset_password_confirm(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordConfirmRequest>,
) -> ApiResult<Value> {
    password_reset::confirm_reset(&state.pool, &state.config, &request.token, &request.password).await?;
    Ok(ApiResponse::done())
}
