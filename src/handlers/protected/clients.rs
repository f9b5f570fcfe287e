// handlers/protected/clients.rs - client companies, consultant assignments, validators

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::client::{
    Assignment, AssignmentInput, AssignmentQuery, AssignmentView, Client, ClientInput, ClientValidator,
    ValidatorInput,
};
use crate::database::models::non_empty;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, ValidatedJson};
use crate::state::AppState;

/// GET /api/clients - admins see every client, consultants only those they are assigned to
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Client>> {
    let rows: Vec<Client> = if user.is_admin() {
        sqlx::query_as("SELECT * FROM clients ORDER BY name")
            .fetch_all(&state.pool)
            .await?
    } else {
        sqlx::query_as(
            "SELECT DISTINCT c.* FROM clients c \
             JOIN user_client_assignments a ON a.client_id = c.id \
             WHERE a.user_id = $1 ORDER BY c.name",
        )
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?
    };
    Ok(ApiResponse::success(rows))
}

/// POST /api/clients
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ClientInput>,
) -> ApiResult<Client> {
    let client: Client = sqlx::query_as(
        "INSERT INTO clients (name, contact_email, contact_name, address) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(input.name.trim())
    .bind(non_empty(input.contact_email))
    .bind(non_empty(input.contact_name))
    .bind(non_empty(input.address))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Client {} created", client.id);
    Ok(ApiResponse::created(client))
}

/// PUT /api/clients/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<ClientInput>,
) -> ApiResult<Client> {
    let client: Option<Client> = sqlx::query_as(
        "UPDATE clients SET name = $1, contact_email = $2, contact_name = $3, address = $4, \
         updated_at = NOW() WHERE id = $5 RETURNING *",
    )
    .bind(input.name.trim())
    .bind(non_empty(input.contact_email))
    .bind(non_empty(input.contact_name))
    .bind(non_empty(input.address))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    let client = client.ok_or_else(|| ApiError::not_found("Client introuvable"))?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let deleted = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Client introuvable"));
    }
    tracing::info!("Client {} deleted", id);
    Ok(ApiResponse::done())
}

/// GET /api/clients/assignments?userId= - `userId` is honoured for admins only
pub async fn assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AssignmentQuery>,
) -> ApiResult<Vec<AssignmentView>> {
    let target = match query.user_id {
        Some(id) if user.is_admin() => id,
        _ => user.id,
    };

    let rows: Vec<AssignmentView> = sqlx::query_as(
        "SELECT a.*, c.name AS client_name, v.name AS validator_name, v.email AS validator_email \
         FROM user_client_assignments a \
         JOIN clients c ON c.id = a.client_id \
         LEFT JOIN client_validators v ON v.id = a.default_validator_id \
         WHERE a.user_id = $1 ORDER BY c.name",
    )
    .bind(target)
    .fetch_all(&state.pool)
    .await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/clients/assignments - assigning the same pair twice is a no-op
pub async fn create_assignment(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AssignmentInput>,
) -> Result<Response, ApiError> {
    let assignment: Option<Assignment> = sqlx::query_as(
        "INSERT INTO user_client_assignments (user_id, client_id, mission_name, default_validator_id) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, client_id) DO NOTHING RETURNING *",
    )
    .bind(input.user_id)
    .bind(input.client_id)
    .bind(non_empty(input.mission_name))
    .bind(input.default_validator_id)
    .fetch_optional(&state.pool)
    .await?;

    Ok(match assignment {
        Some(row) => {
            tracing::info!("User {} assigned to client {}", row.user_id, row.client_id);
            ApiResponse::with_status(row, StatusCode::CREATED).into_response()
        }
        None => ApiResponse::done().into_response(),
    })
}

/// DELETE /api/clients/assignments/:id
pub async fn delete_assignment(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let deleted = sqlx::query("DELETE FROM user_client_assignments WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Affectation introuvable"));
    }
    Ok(ApiResponse::done())
}

/// GET /api/clients/:id/validators
pub async fn validators(State(state): State<AppState>, Path(client_id): Path<Uuid>) -> ApiResult<Vec<ClientValidator>> {
    let rows: Vec<ClientValidator> =
        sqlx::query_as("SELECT * FROM client_validators WHERE client_id = $1 ORDER BY created_at DESC")
            .bind(client_id)
            .fetch_all(&state.pool)
            .await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/clients/:id/validators
pub async fn create_validator(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<ValidatorInput>,
) -> ApiResult<ClientValidator> {
    let validator: ClientValidator = sqlx::query_as(
        "INSERT INTO client_validators (client_id, name, email) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(client_id)
    .bind(input.name.trim())
    .bind(input.email.trim())
    .fetch_one(&state.pool)
    .await?;
    Ok(ApiResponse::created(validator))
}

/// DELETE /api/clients/validators/:id
pub async fn delete_validator(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let deleted = sqlx::query("DELETE FROM client_validators WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Valideur introuvable"));
    }
    Ok(ApiResponse::done())
}
