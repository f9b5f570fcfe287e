use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::email::{send_logged, templates, EmailMessage, Mailer};
use super::tokens::{self, TokenKind, TokenRejection};
use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::error::ApiError;

/// Issue (or replace) the user's reset token and mail the link. Unknown
/// addresses succeed silently.
pub async fn request_reset(pool: &PgPool, mailer: &dyn Mailer, config: &AppConfig, email: &str) -> Result<(), ApiError> {
    let user: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, email FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?;
    let Some((user_id, stored_email)) = user else {
        tracing::info!("Password reset requested for unknown address");
        return Ok(());
    };

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(config.tokens.password_reset_ttl_minutes);

    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id) DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at, created_at = NOW()",
    )
    .bind(user_id)
    .bind(&token)
    .bind(expires_at)
    .execute(pool)
    .await?;

    tracing::info!("Password reset token issued for user {}", user_id);
    let link = format!("{}/auth?reset={}", config.security.frontend_url, token);
    send_logged(
        mailer,
        EmailMessage::new(stored_email, templates::RESET_SUBJECT, templates::password_reset(&link)),
    )
    .await;
    Ok(())
}

/// Delete the token and, if it was still valid, set the new password
pub async fn confirm_reset(pool: &PgPool, config: &AppConfig, token: &str, password: &str) -> Result<(), ApiError> {
    // Hash before opening the transaction so the row lock is short
    let hashed = hash_password(password, config.security.bcrypt_cost).await?;

    let mut tx = pool.begin().await?;
    let row: Option<(Uuid, DateTime<Utc>)> =
        sqlx::query_as("DELETE FROM password_reset_tokens WHERE token = $1 RETURNING user_id, expires_at")
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;

    let Some((user_id, expires_at)) = row else {
        return Err(TokenRejection::Unknown.into_api_error(TokenKind::PasswordReset));
    };
    if let Err(rejection) = tokens::check(Some(expires_at), None, Utc::now()) {
        // The stale row stays deleted
        tx.commit().await?;
        return Err(rejection.into_api_error(TokenKind::PasswordReset));
    }

    sqlx::query("UPDATE users SET encrypted_password = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hashed)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!("Password reset completed for user {}", user_id);
    Ok(())
}
