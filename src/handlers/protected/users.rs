// handlers/protected/users.rs - admin account management

use axum::extract::{Path, State};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::database::models::user::{CreateUserRequest, RoleRequest, UserWithRoles};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, ValidatedJson};
use crate::services::accounts;
use crate::state::AppState;
use crate::types::Role;

/// GET /api/users - profiles with their aggregated roles, newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<UserWithRoles>> {
    let rows: Vec<UserWithRoles> = sqlx::query_as(
        "SELECT p.id, p.email, p.full_name, p.created_at, \
         COALESCE(ARRAY_AGG(ur.role ORDER BY ur.role) FILTER (WHERE ur.role IS NOT NULL), '{}') AS roles \
         FROM profiles p \
         LEFT JOIN user_roles ur ON ur.user_id = p.id \
         GROUP BY p.id \
         ORDER BY p.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(ApiResponse::success(rows))
}

/**
 * POST /api/users/create - account created by an admin
 *
 * Input: `{ "email", "password", "role"? }`
 * Plain `user` is implied; any other role is granted in the same transaction.
 */
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<Value> {
    let email = request.email.trim().to_string();
    let hashed = hash_password(&request.password, state.config.security.bcrypt_cost).await?;

    let mut tx = state.pool.begin().await?;
    let user_id = accounts::create_account(&mut tx, &email, &hashed, None, "Email déjà utilisé").await?;
    if let Some(role) = request.role.filter(|r| *r != Role::User) {
        accounts::grant_role(&mut *tx, user_id, role).await?;
    }
    tx.commit().await?;

    Ok(ApiResponse::created(json!({ "user": { "id": user_id, "email": email } })))
}

/// POST /api/users/:id/roles
pub async fn add_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    JsonBody(request): JsonBody<RoleRequest>,
) -> ApiResult<Value> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    if !exists {
        return Err(ApiError::not_found("Utilisateur introuvable"));
    }

    accounts::grant_role(&state.pool, user_id, request.role).await?;
    tracing::info!("Role {} granted to {}", request.role, user_id);
    Ok(ApiResponse::done())
}

/// DELETE /api/users/:id/roles/:role
pub async fn remove_role(
    State(state): State<AppState>,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> ApiResult<Value> {
    let role: Role = role
        .parse()
        .map_err(|_| ApiError::bad_request("Rôle invalide"))?;

    let removed = accounts::revoke_role(&state.pool, user_id, role).await?;
    if removed > 0 {
        tracing::info!("Role {} revoked from {}", role, user_id);
    }
    Ok(ApiResponse::done())
}
