use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::types::Role;

pub const ADMIN: &[Role] = &[Role::Admin];
pub const ADMIN_OR_CRA: &[Role] = &[Role::Admin, Role::UserCra];
pub const CRA: &[Role] = &[Role::UserCra];

/// Per-route allow-list check; must be layered inside `jwt_auth_middleware`
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Non authentifié"))?;

    user.require_any(allowed)?;

    Ok(next.run(request).await)
}
