use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::accounts;
use super::email::{send_logged, templates, EmailMessage, Mailer};
use super::tokens::{self, TokenKind, TokenRejection};
use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::database::models::token::{AcceptInvitationRequest, CreateInvitationRequest, UserInvitation};
use crate::error::ApiError;
use crate::types::Role;

pub async fn create(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &AppConfig,
    invited_by: Uuid,
    request: CreateInvitationRequest,
) -> Result<UserInvitation, ApiError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(config.tokens.invitation_ttl_days);

    let invitation: UserInvitation = sqlx::query_as(
        "INSERT INTO user_invitations (email, first_name, last_name, token, status, expires_at, invited_by) \
         VALUES ($1, $2, $3, $4, 'pending', $5, $6) RETURNING *",
    )
    .bind(request.email.trim())
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&token)
    .bind(expires_at)
    .bind(invited_by)
    .fetch_one(pool)
    .await?;

    tracing::info!("Invitation {} issued by {}", invitation.id, invited_by);
    let link = format!("{}/cra/auth?token={}", config.security.frontend_url, token);
    send_logged(
        mailer,
        EmailMessage::new(
            invitation.email.clone(),
            templates::INVITATION_SUBJECT,
            templates::invitation(invitation.first_name.as_deref(), &link, config.tokens.invitation_ttl_days),
        ),
    )
    .await;

    Ok(invitation)
}

/// Pending, unexpired invitation for a token
pub async fn lookup(pool: &PgPool, token: &str) -> Result<UserInvitation, ApiError> {
    let invitation: Option<UserInvitation> =
        sqlx::query_as("SELECT * FROM user_invitations WHERE token = $1 AND status = 'pending'")
            .bind(token)
            .fetch_optional(pool)
            .await?;
    let invitation =
        invitation.ok_or_else(|| TokenRejection::Unknown.into_api_error(TokenKind::Invitation))?;
    tokens::check(Some(invitation.expires_at), Some(&invitation.status), Utc::now())
        .map_err(|r| r.into_api_error(TokenKind::Invitation))?;
    Ok(invitation)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<UserInvitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM user_invitations ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Flip the invitation to `accepted` and create the consultant account in
/// one transaction. The guarded update is what makes the token single-use.
pub async fn accept(pool: &PgPool, config: &AppConfig, request: AcceptInvitationRequest) -> Result<Uuid, ApiError> {
    let hashed = hash_password(&request.password, config.security.bcrypt_cost).await?;

    let mut tx = pool.begin().await?;
    let invitation: Option<UserInvitation> = sqlx::query_as(
        "UPDATE user_invitations SET status = 'accepted', accepted_at = NOW(), updated_at = NOW() \
         WHERE token = $1 AND status = 'pending' AND expires_at > NOW() RETURNING *",
    )
    .bind(&request.token)
    .fetch_optional(&mut *tx)
    .await?;
    let invitation =
        invitation.ok_or_else(|| TokenRejection::Unknown.into_api_error(TokenKind::Invitation))?;

    let full_name = request.full_name.clone().filter(|n| !n.trim().is_empty()).or_else(|| {
        let joined = [invitation.first_name.as_deref(), invitation.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Some(joined).filter(|n| !n.trim().is_empty())
    });

    let user_id = accounts::create_account(
        &mut tx,
        &invitation.email,
        &hashed,
        full_name.as_deref(),
        "Cet email est déjà utilisé",
    )
    .await?;
    accounts::grant_role(&mut *tx, user_id, Role::UserCra).await?;
    tx.commit().await?;

    tracing::info!("Invitation {} accepted, account {}", invitation.id, user_id);
    Ok(user_id)
}
