mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{lazy_app, request, send, token_for};
use wavy_api::types::Role;

async fn status_of(method: Method, uri: &str, roles: &[Role]) -> Result<StatusCode> {
    let app = lazy_app();
    let token = token_for(roles);
    let body = matches!(method, Method::POST | Method::PUT).then(|| json!({}));
    let (status, _) = send(&app, request(method, uri, Some(&token), body)).await?;
    Ok(status)
}

#[tokio::test]
async fn admin_routes_reject_other_roles() -> Result<()> {
    for roles in [vec![], vec![Role::User], vec![Role::UserCra]] {
        assert_eq!(status_of(Method::GET, "/api/users", &roles).await?, StatusCode::FORBIDDEN);
        assert_eq!(status_of(Method::GET, "/api/stats", &roles).await?, StatusCode::FORBIDDEN);
        assert_eq!(status_of(Method::POST, "/api/jobs", &roles).await?, StatusCode::FORBIDDEN);
        assert_eq!(status_of(Method::GET, "/api/applications", &roles).await?, StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(Method::DELETE, "/api/clients/validators/00000000-0000-0000-0000-000000000001", &roles).await?,
            StatusCode::FORBIDDEN
        );
    }
    Ok(())
}

#[tokio::test]
async fn cra_portal_rejects_plain_users() -> Result<()> {
    let plain = [Role::User];
    assert_eq!(status_of(Method::GET, "/api/cra", &plain).await?, StatusCode::FORBIDDEN);
    assert_eq!(status_of(Method::GET, "/api/clients", &plain).await?, StatusCode::FORBIDDEN);
    assert_eq!(status_of(Method::POST, "/api/cra/send-validation", &plain).await?, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn submit_is_for_consultants_only() -> Result<()> {
    let uri = "/api/cra/00000000-0000-0000-0000-000000000001/submit";
    assert_eq!(status_of(Method::PUT, uri, &[Role::Admin]).await?, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn allowed_role_reaches_the_handler() -> Result<()> {
    // The handler runs and fails on the missing database, not on the role check
    assert_eq!(status_of(Method::GET, "/api/stats", &[Role::Admin]).await?, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_of(Method::GET, "/api/cra", &[Role::UserCra]).await?, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn public_and_admin_methods_share_a_path() -> Result<()> {
    let app = lazy_app();

    // POST /api/jobs is admin-only while GET stays public
    let (status, _) = send(&app, request(Method::POST, "/api/jobs", None, Some(json!({})))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::GET, "/api/jobs", None, None)).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn invitation_lookup_needs_a_token() -> Result<()> {
    let app = lazy_app();
    let (status, body) = send(&app, request(Method::GET, "/api/users/invitations", None, None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token requis");
    Ok(())
}
