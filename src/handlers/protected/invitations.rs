use axum::{extract::State, Extension};

use crate::database::models::token::{CreateInvitationRequest, UserInvitation};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::services::invitations;
use crate::state::AppState;

/// GET /api/users/invitations/all
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<UserInvitation>> {
    let rows = invitations::list_all(&state.pool).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/users/invitations - issue a consultant invitation and mail the link
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<CreateInvitationRequest>,
) -> ApiResult<UserInvitation> {
    let invitation =
        invitations::create(&state.pool, state.mailer.as_ref(), &state.config, user.id, request).await?;
    Ok(ApiResponse::created(invitation))
}
