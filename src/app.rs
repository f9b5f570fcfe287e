use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_roles, ADMIN, ADMIN_OR_CRA, CRA};
use crate::state::AppState;
use crate::types::Role;

/// Headroom over the upload cap for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Full application router
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        // Public
        .merge(public_routes())
        // Protected: JWT, then the group's role allow-list
        .merge(authenticated_routes(&state))
        .merge(role_routes(&state, ADMIN, admin_routes()))
        .merge(role_routes(&state, ADMIN_OR_CRA, admin_or_cra_routes()))
        .merge(role_routes(&state, CRA, cra_routes()))
        .fallback(not_found)
        .with_state(state);

    let body_limit = body_limit(&config);
    let router = router.layer(
        // The limit layer goes outermost: its response body has no Default, which Cors needs
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(cors_layer(&config))
            .layer(DefaultBodyLimit::max(body_limit)),
    );

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn role_routes(state: &AppState, allowed: &'static [Role], routes: Router<AppState>) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(allowed, require_roles))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn public_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::{auth, catalog, cra, health, invitations, otp, submissions};

    Router::new()
        .route("/health", get(health::get))
        // Token acquisition and recovery
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/reset-password-confirm", post(auth::reset_password_confirm))
        .route("/api/otp/send", post(otp::send))
        .route("/api/otp/verify", post(otp::verify))
        // Invitation links
        .route("/api/users/invitations", get(invitations::lookup))
        .route("/api/users/invitations/accept", post(invitations::accept))
        // Site catalog
        .route("/api/jobs", get(catalog::jobs))
        .route("/api/trainings", get(catalog::trainings))
        .route("/api/trainings/categories", get(catalog::categories))
        // Public forms
        .route("/api/applications", post(submissions::application))
        .route("/api/training-leads", post(submissions::training_lead))
        .route("/api/contact", post(submissions::contact))
        .route("/api/upload", post(submissions::upload))
        // Client decision on a CRA
        .route("/api/cra/validate", post(cra::validate))
}

fn authenticated_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::any;
    use handlers::protected::{auth, db};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        // Per-table grants are resolved in the handler
        .route("/api/db/:table", any(db::handle))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes() -> Router<AppState> {
    use axum::routing::{delete, post, put};
    use handlers::protected::{catalog, clients, content, invitations, users};

    Router::new()
        // Accounts
        .route("/api/users", get(users::list))
        .route("/api/users/create", post(users::create))
        .route("/api/users/:id/roles", post(users::add_role))
        .route("/api/users/:id/roles/:role", delete(users::remove_role))
        .route("/api/users/invitations/all", get(invitations::list))
        .route("/api/users/invitations", post(invitations::create))
        // Catalog edits
        .route("/api/jobs", post(catalog::create_job))
        .route("/api/jobs/:id", put(catalog::update_job).delete(catalog::delete_job))
        .route("/api/trainings", post(catalog::create_training))
        .route(
            "/api/trainings/:id",
            put(catalog::update_training).delete(catalog::delete_training),
        )
        // Inbox
        .route("/api/applications", get(content::applications))
        .route("/api/training-leads", get(content::training_leads))
        .route("/api/contact", get(content::contact_messages))
        .route("/api/stats", get(content::stats))
        .route("/api/uploads/cvs/:filename", get(content::download_cv))
        // Clients
        .route("/api/clients", post(clients::create))
        .route("/api/clients/:id", put(clients::update).delete(clients::delete))
        .route("/api/clients/assignments", post(clients::create_assignment))
        .route("/api/clients/assignments/:id", delete(clients::delete_assignment))
        .route(
            "/api/clients/:id/validators",
            get(clients::validators).post(clients::create_validator),
        )
        .route("/api/clients/validators/:id", delete(clients::delete_validator))
}

fn admin_or_cra_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::protected::{clients, cra};

    Router::new()
        .route("/api/clients", get(clients::list))
        .route("/api/clients/assignments", get(clients::assignments))
        .route("/api/cra", get(cra::list).post(cra::create))
        .route("/api/cra/send-validation", post(cra::send_validation))
        .route("/api/cra/:id", get(cra::get).put(cra::update).delete(cra::delete))
        .route("/api/cra/:id/days", get(cra::days).post(cra::replace_days))
}

fn cra_routes() -> Router<AppState> {
    use axum::routing::put;
    use handlers::protected::cra;

    Router::new().route("/api/cra/:id/submit", put(cra::submit))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route introuvable")
}

/// Large enough for a full upload; JSON bodies are capped by the same limit
fn body_limit(config: &AppConfig) -> usize {
    config
        .api
        .max_request_size_bytes
        .max(config.api.upload_max_bytes + MULTIPART_OVERHEAD)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.security.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_leaves_room_for_uploads() {
        let mut config = AppConfig::development();
        config.api.max_request_size_bytes = 1024;
        config.api.upload_max_bytes = 10 * 1024 * 1024;
        assert_eq!(body_limit(&config), 11 * 1024 * 1024);
    }
}
