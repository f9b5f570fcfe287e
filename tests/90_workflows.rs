//! Single-use token flows against a real database. Set TEST_DATABASE_URL to
//! run them; they return early otherwise.

mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{create_user, db_state, request, send, token_for_user};
use wavy_api::database::models::cra::ValidationAction;
use wavy_api::database::models::token::{AcceptInvitationRequest, CreateInvitationRequest};
use wavy_api::middleware::AuthUser;
use wavy_api::services::{cra_validation, invitations, otp, password_reset};
use wavy_api::types::Role;

#[tokio::test]
async fn otp_code_verifies_once() -> Result<()> {
    let Some((state, mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, email) = create_user(&state.pool, &[]).await?;

    otp::send_code(&state.pool, state.mailer.as_ref(), &state.config.tokens, user_id).await?;
    let code: String = sqlx::query_scalar("SELECT code FROM otp_codes WHERE user_id = $1 AND used = false")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert!(mailer.messages().iter().any(|m| m.to == vec![email.clone()] && m.html.contains(&code)));

    otp::verify_code(&state.pool, &state.config.tokens, user_id, &code).await?;
    assert!(otp::is_already_verified(&state.pool, user_id).await?);

    let second = otp::verify_code(&state.pool, &state.config.tokens, user_id, &code).await;
    assert_eq!(second.unwrap_err().message(), "Code invalide ou expiré");
    Ok(())
}

#[tokio::test]
async fn reset_token_changes_password_once() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, email) = create_user(&state.pool, &[]).await?;

    password_reset::request_reset(&state.pool, state.mailer.as_ref(), &state.config, &email).await?;
    let token: String = sqlx::query_scalar("SELECT token FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;

    password_reset::confirm_reset(&state.pool, &state.config, &token, "new-password").await?;
    let second = password_reset::confirm_reset(&state.pool, &state.config, &token, "other-password").await;
    assert!(second.is_err());

    let hash: String = sqlx::query_scalar("SELECT encrypted_password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert!(wavy_api::auth::verify_password("new-password", &hash).await?);
    Ok(())
}

#[tokio::test]
async fn reset_for_unknown_email_still_succeeds() -> Result<()> {
    let Some((state, mailer)) = db_state().await? else { return Ok(()) };
    let before = mailer.messages().len();
    password_reset::request_reset(&state.pool, state.mailer.as_ref(), &state.config, "nobody@nowhere.fr").await?;
    assert_eq!(mailer.messages().len(), before);
    Ok(())
}

#[tokio::test]
async fn invitation_is_accepted_once() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (admin_id, _) = create_user(&state.pool, &[Role::Admin]).await?;
    let email = format!("{}@invite.wavy.fr", Uuid::new_v4());

    let invitation = invitations::create(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        admin_id,
        CreateInvitationRequest { email: email.clone(), first_name: Some("Marie".to_string()), last_name: None },
    )
    .await?;

    let accept = || AcceptInvitationRequest {
        token: invitation.token.clone(),
        password: "secret123".to_string(),
        full_name: Some("Marie Curie".to_string()),
    };
    let user_id = invitations::accept(&state.pool, &state.config, accept()).await?;
    let roles = wavy_api::services::accounts::load_roles(&state.pool, user_id).await?;
    assert_eq!(roles, vec![Role::UserCra]);

    let second = invitations::accept(&state.pool, &state.config, accept()).await;
    assert_eq!(second.unwrap_err().status_code(), 404);
    Ok(())
}

#[tokio::test]
async fn client_validation_applies_once() -> Result<()> {
    let Some((state, mailer)) = db_state().await? else { return Ok(()) };
    let (consultant_id, consultant_email) = create_user(&state.pool, &[Role::UserCra]).await?;

    let cra_id: Uuid = sqlx::query_scalar(
        "INSERT INTO cra_reports (user_id, month, worked_days, absent_days, status) \
         VALUES ($1, '2024-03', 19, 1, 'submitted') RETURNING id",
    )
    .bind(consultant_id)
    .fetch_one(&state.pool)
    .await?;
    sqlx::query("INSERT INTO cra_day_details (cra_report_id, date, state) VALUES ($1, '2024-03-04', 'worked')")
        .bind(cra_id)
        .execute(&state.pool)
        .await?;

    let consultant = AuthUser { id: consultant_id, email: consultant_email.clone(), roles: vec![Role::UserCra] };
    cra_validation::send_validation(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        &consultant,
        cra_id,
        "client@example.fr",
    )
    .await?;

    let token: String = sqlx::query_scalar("SELECT validation_token FROM cra_reports WHERE id = $1")
        .bind(cra_id)
        .fetch_one(&state.pool)
        .await?;

    let outcome = cra_validation::validate(&state.pool, state.mailer.as_ref(), &token, ValidationAction::Approve).await?;
    assert_eq!(outcome.status, "approved");
    assert_eq!(outcome.month, "mars 2024");

    let receipts: Vec<_> = mailer.messages().into_iter().filter(|m| !m.attachments.is_empty()).collect();
    assert_eq!(receipts.len(), 2);
    assert!(receipts.iter().any(|m| m.to == vec![consultant_email.clone()]));

    let second = cra_validation::validate(&state.pool, state.mailer.as_ref(), &token, ValidationAction::Reject).await;
    assert_eq!(second.unwrap_err().message(), "Token invalide ou expiré");

    let status: Option<String> =
        sqlx::query_scalar("SELECT client_validation_status FROM cra_reports WHERE id = $1")
            .bind(cra_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(status.as_deref(), Some("approved"));
    Ok(())
}

#[tokio::test]
async fn duplicate_cra_for_a_month_conflicts() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (consultant_id, _) = create_user(&state.pool, &[Role::UserCra]).await?;
    let token = token_for_user(consultant_id, &[Role::UserCra]);
    let app = wavy_api::app(state);

    let body = json!({ "month": "2024-05", "worked_days": 20 });
    let (status, created) = send(&app, request(Method::POST, "/api/cra", Some(&token), Some(body.clone()))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["status"], "draft");

    let (status, body) = send(&app, request(Method::POST, "/api/cra", Some(&token), Some(body))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Un CRA existe déjà pour ce mois");
    Ok(())
}

#[tokio::test]
async fn consultants_only_see_their_reports() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (owner_id, _) = create_user(&state.pool, &[Role::UserCra]).await?;
    let (other_id, _) = create_user(&state.pool, &[Role::UserCra]).await?;
    let (admin_id, _) = create_user(&state.pool, &[Role::Admin]).await?;

    let cra_id: Uuid = sqlx::query_scalar(
        "INSERT INTO cra_reports (user_id, month, status) VALUES ($1, '2024-06', 'draft') RETURNING id",
    )
    .bind(owner_id)
    .fetch_one(&state.pool)
    .await?;
    let app = wavy_api::app(state);
    let uri = format!("/api/cra/{}", cra_id);

    let other = token_for_user(other_id, &[Role::UserCra]);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&other), None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let owner = token_for_user(owner_id, &[Role::UserCra]);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&owner), None)).await?;
    assert_eq!(status, StatusCode::OK);

    let admin = token_for_user(admin_id, &[Role::Admin]);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&admin), None)).await?;
    assert_eq!(status, StatusCode::OK);

    // Generic endpoint: the owner filter hides the row from another consultant
    let db_uri = format!("/api/db/cra_reports?id=eq.{}", cra_id);
    let (_, body) = send(&app, request(Method::GET, &db_uri, Some(&other), None)).await?;
    assert_eq!(body["data"], json!([]));
    let (_, body) = send(&app, request(Method::GET, &db_uri, Some(&owner), None)).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn expired_otp_code_is_rejected() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, _) = create_user(&state.pool, &[]).await?;

    otp::send_code(&state.pool, state.mailer.as_ref(), &state.config.tokens, user_id).await?;
    let code: String = sqlx::query_scalar(
        "UPDATE otp_codes SET expires_at = NOW() - interval '1 minute' WHERE user_id = $1 RETURNING code",
    )
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;

    let err = otp::verify_code(&state.pool, &state.config.tokens, user_id, &code).await.unwrap_err();
    assert_eq!(err.message(), "Code invalide ou expiré");
    assert!(!otp::is_already_verified(&state.pool, user_id).await?);
    Ok(())
}

#[tokio::test]
async fn expired_reset_token_keeps_the_old_password() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, email) = create_user(&state.pool, &[]).await?;

    password_reset::request_reset(&state.pool, state.mailer.as_ref(), &state.config, &email).await?;
    let token: String = sqlx::query_scalar(
        "UPDATE password_reset_tokens SET expires_at = NOW() - interval '1 minute' \
         WHERE user_id = $1 RETURNING token",
    )
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;

    let err = password_reset::confirm_reset(&state.pool, &state.config, &token, "new-password")
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Token invalide ou expiré");

    let hash: String = sqlx::query_scalar("SELECT encrypted_password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert!(wavy_api::auth::verify_password("secret123", &hash).await?);

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(left, 0);
    Ok(())
}

#[tokio::test]
async fn expired_invitation_cannot_be_looked_up_or_accepted() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (admin_id, _) = create_user(&state.pool, &[Role::Admin]).await?;
    let email = format!("{}@invite.wavy.fr", Uuid::new_v4());

    let invitation = invitations::create(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        admin_id,
        CreateInvitationRequest { email: email.clone(), first_name: None, last_name: None },
    )
    .await?;
    sqlx::query("UPDATE user_invitations SET expires_at = NOW() - interval '1 day' WHERE id = $1")
        .bind(invitation.id)
        .execute(&state.pool)
        .await?;

    let lookup = invitations::lookup(&state.pool, &invitation.token).await;
    assert_eq!(lookup.unwrap_err().status_code(), 404);

    let accept = AcceptInvitationRequest {
        token: invitation.token.clone(),
        password: "secret123".to_string(),
        full_name: None,
    };
    assert_eq!(invitations::accept(&state.pool, &state.config, accept).await.unwrap_err().status_code(), 404);

    let registered: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    assert!(!registered);
    Ok(())
}

/// Submitted report for a fresh consultant, sent to a client contact
async fn report_sent_for_validation(state: &wavy_api::AppState) -> Result<(Uuid, String)> {
    let (consultant_id, consultant_email) = create_user(&state.pool, &[Role::UserCra]).await?;
    let cra_id: Uuid = sqlx::query_scalar(
        "INSERT INTO cra_reports (user_id, month, worked_days, status) \
         VALUES ($1, '2024-04', 20, 'submitted') RETURNING id",
    )
    .bind(consultant_id)
    .fetch_one(&state.pool)
    .await?;

    let consultant = AuthUser { id: consultant_id, email: consultant_email, roles: vec![Role::UserCra] };
    cra_validation::send_validation(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        &consultant,
        cra_id,
        "client@example.fr",
    )
    .await?;
    let token: String = sqlx::query_scalar("SELECT validation_token FROM cra_reports WHERE id = $1")
        .bind(cra_id)
        .fetch_one(&state.pool)
        .await?;
    Ok((cra_id, token))
}

#[tokio::test]
async fn expired_validation_link_answers_token_expired() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (cra_id, token) = report_sent_for_validation(&state).await?;
    sqlx::query("UPDATE cra_reports SET token_expires_at = NOW() - interval '1 day' WHERE id = $1")
        .bind(cra_id)
        .execute(&state.pool)
        .await?;

    let err = cra_validation::validate(&state.pool, state.mailer.as_ref(), &token, ValidationAction::Approve)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Token expiré");
    assert_eq!(err.to_json()["message"], "Ce lien de validation a expiré.");

    let status: Option<String> =
        sqlx::query_scalar("SELECT client_validation_status FROM cra_reports WHERE id = $1")
            .bind(cra_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(status.as_deref(), Some("sent"));
    Ok(())
}

#[tokio::test]
async fn approved_report_is_not_sent_again() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (cra_id, token) = report_sent_for_validation(&state).await?;
    cra_validation::validate(&state.pool, state.mailer.as_ref(), &token, ValidationAction::Approve).await?;

    let owner_id: Uuid = sqlx::query_scalar("SELECT user_id FROM cra_reports WHERE id = $1")
        .bind(cra_id)
        .fetch_one(&state.pool)
        .await?;
    let owner = AuthUser { id: owner_id, email: String::new(), roles: vec![Role::UserCra] };
    let err = cra_validation::send_validation(
        &state.pool,
        state.mailer.as_ref(),
        &state.config,
        &owner,
        cra_id,
        "other@example.fr",
    )
    .await
    .unwrap_err();
    assert_eq!(err.message(), "Déjà traité");

    let (status, token): (Option<String>, Option<String>) =
        sqlx::query_as("SELECT client_validation_status, validation_token FROM cra_reports WHERE id = $1")
            .bind(cra_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(status.as_deref(), Some("approved"));
    assert!(token.is_none());
    Ok(())
}

#[tokio::test]
async fn cleanup_purges_expired_tokens_and_closes_invitations() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, _) = create_user(&state.pool, &[]).await?;
    let invitation_token = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO otp_codes (user_id, code, expires_at) VALUES ($1, '123456', NOW() - interval '1 hour')",
    )
    .bind(user_id)
    .execute(&state.pool)
    .await?;
    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token, expires_at) \
         VALUES ($1, $2, NOW() - interval '1 hour')",
    )
    .bind(user_id)
    .bind(Uuid::new_v4().to_string())
    .execute(&state.pool)
    .await?;
    sqlx::query(
        "INSERT INTO user_invitations (email, token, status, expires_at) \
         VALUES ('stale@invite.wavy.fr', $1, 'pending', NOW() - interval '1 day')",
    )
    .bind(&invitation_token)
    .execute(&state.pool)
    .await?;

    let report = wavy_api::services::tokens::cleanup_expired(&state.pool).await?;
    assert!(report.otp_codes >= 1);
    assert!(report.password_reset_tokens >= 1);
    assert!(report.invitations_expired >= 1);

    let (otp, reset): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM otp_codes WHERE user_id = $1), \
                (SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!((otp, reset), (0, 0));

    let status: String = sqlx::query_scalar("SELECT status FROM user_invitations WHERE token = $1")
        .bind(&invitation_token)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status, "expired");
    Ok(())
}

#[tokio::test]
async fn self_made_invitations_cannot_grant_a_role() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (user_id, _) = create_user(&state.pool, &[]).await?;
    let token = token_for_user(user_id, &[]);
    let app = wavy_api::app(state.clone());
    let email = format!("{}@self.wavy.fr", Uuid::new_v4());

    let row = json!({
        "email": email,
        "token": "chosen-token",
        "status": "pending",
        "expires_at": "2099-01-01T00:00:00Z",
    });
    let (status, _) = send(&app, request(Method::POST, "/api/db/user_invitations", Some(&token), Some(row))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let accept = json!({ "token": "chosen-token", "password": "secret123" });
    let (status, _) = send(&app, request(Method::POST, "/api/users/invitations/accept", None, Some(accept))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let registered: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    assert!(!registered);
    Ok(())
}

async fn insert_report(pool: &sqlx::PgPool, user_id: Uuid, month: &str, status: &str) -> Result<Uuid> {
    let id = sqlx::query_scalar(
        "INSERT INTO cra_reports (user_id, month, worked_days, status) VALUES ($1, $2, 18, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(month)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[tokio::test]
async fn table_endpoint_only_edits_draft_reports() -> Result<()> {
    let Some((state, _mailer)) = db_state().await? else { return Ok(()) };
    let (consultant_id, _) = create_user(&state.pool, &[Role::UserCra]).await?;
    let token = token_for_user(consultant_id, &[Role::UserCra]);

    let submitted = insert_report(&state.pool, consultant_id, "2024-07", "submitted").await?;
    let draft = insert_report(&state.pool, consultant_id, "2024-08", "draft").await?;
    let app = wavy_api::app(state.clone());

    // Workflow columns are refused outright
    let uri = format!("/api/db/cra_reports?id=eq.{}", submitted);
    let body = json!({ "status": "validated", "client_validation_status": "approved", "worked_days": 30 });
    let (status, _) = send(&app, request(Method::PATCH, &uri, Some(&token), Some(body))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Plain edits match no row once the report left draft
    let (status, body) =
        send(&app, request(Method::PATCH, &uri, Some(&token), Some(json!({ "worked_days": 30 })))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::Value::Null);
    let (_, body) = send(&app, request(Method::DELETE, &uri, Some(&token), None)).await?;
    assert_eq!(body["data"]["deleted"], 0);

    let row = json!({ "cra_report_id": submitted, "date": "2024-07-01", "state": "worked" });
    let (status, _) = send(&app, request(Method::POST, "/api/db/cra_day_details", Some(&token), Some(row))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let worked: rust_decimal::Decimal = sqlx::query_scalar("SELECT worked_days FROM cra_reports WHERE id = $1")
        .bind(submitted)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(worked, rust_decimal::Decimal::from(18));

    // Drafts stay editable
    let uri = format!("/api/db/cra_reports?id=eq.{}", draft);
    let (status, body) =
        send(&app, request(Method::PATCH, &uri, Some(&token), Some(json!({ "worked_days": 19 })))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], draft.to_string());
    Ok(())
}
