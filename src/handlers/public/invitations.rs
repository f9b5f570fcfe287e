use axum::extract::{Query, State};
use serde_json::{json, Value};

use crate::database::models::token::{AcceptInvitationRequest, InvitationQuery, UserInvitation};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::invitations;
use crate::state::AppState;

/// GET /api/users/invitations?token= - pending invitation behind an emailed link
pub async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<InvitationQuery>,
) -> ApiResult<UserInvitation> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Token requis"))?;
    let invitation = invitations::lookup(&state.pool, &token).await?;
    Ok(ApiResponse::success(invitation))
}

/// POST /api/users/invitations/accept - create the consultant account
pub async fn accept(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<AcceptInvitationRequest>,
) -> ApiResult<Value> {
    let user_id = invitations::accept(&state.pool, &state.config, request).await?;
    Ok(ApiResponse::created(json!({ "id": user_id })))
}
