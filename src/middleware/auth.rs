use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{decode_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        let mut roles = claims.roles;
        if roles.is_empty() {
            roles.push(claims.role);
        }
        Self {
            id: claims.id,
            email: claims.email,
            roles,
        }
    }
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Role-set intersection against a route allow-list
    pub fn has_any(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|role| self.has_role(*role))
    }

    pub fn require_any(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.has_any(allowed) {
            Ok(())
        } else {
            tracing::warn!("User {} denied, needs one of {:?}", self.id, allowed);
            Err(ApiError::forbidden("Accès refusé"))
        }
    }

    /// Admins bypass ownership
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract JWT from Authorization header
    let token = extract_jwt_from_headers(&headers).map_err(|msg| {
        tracing::debug!("Rejected request without usable token: {}", msg);
        ApiError::unauthorized("Non authentifié")
    })?;

    // Validate and decode JWT
    let claims = decode_jwt(&token, &state.config.security.jwt_secret)?;

    // Convert claims to AuthUser and inject into request
    let auth_user = AuthUser::from(claims);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
