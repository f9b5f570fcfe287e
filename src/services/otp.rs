use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use super::email::{send_logged, templates, EmailMessage, Mailer};
use super::tokens::{TokenKind, TokenRejection};
use crate::config::TokenConfig;
use crate::error::ApiError;

/// Six random digits
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Replace the user's unused codes with a fresh one and mail it to the
/// address on file
pub async fn send_code(
    pool: &PgPool,
    mailer: &dyn Mailer,
    tokens: &TokenConfig,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    let email = email.ok_or_else(|| ApiError::not_found("Utilisateur introuvable"))?;

    let code = generate_code();
    let expires_at = Utc::now() + Duration::minutes(tokens.otp_ttl_minutes);

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM otp_codes WHERE user_id = $1 AND used = false")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO otp_codes (user_id, code, used, expires_at) VALUES ($1, $2, false, $3)")
        .bind(user_id)
        .bind(&code)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!("OTP issued for user {}", user_id);
    send_logged(
        mailer,
        EmailMessage::new(email, templates::OTP_SUBJECT, templates::otp(&code, tokens.otp_ttl_minutes)),
    )
    .await;
    Ok(())
}

/// Consume a code. The matching row is flipped to `used` and kept alive for
/// the remember period in the same statement, so a code verifies once.
pub async fn verify_code(
    pool: &PgPool,
    tokens: &TokenConfig,
    user_id: Uuid,
    code: &str,
) -> Result<(), ApiError> {
    let consumed: Option<Uuid> = sqlx::query_scalar(
        "UPDATE otp_codes SET used = true, expires_at = NOW() + make_interval(days => $3) \
         WHERE user_id = $1 AND code = $2 AND used = false AND expires_at > NOW() \
         RETURNING id",
    )
    .bind(user_id)
    .bind(code)
    .bind(tokens.otp_remember_days as i32)
    .fetch_optional(pool)
    .await?;

    let Some(id) = consumed else {
        return Err(TokenRejection::Unknown.into_api_error(TokenKind::Otp));
    };

    sqlx::query("DELETE FROM otp_codes WHERE user_id = $1 AND expires_at < NOW() AND id <> $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!("OTP verified for user {}", user_id);
    Ok(())
}

/// A used code still inside its remember period
pub async fn is_already_verified(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM otp_codes WHERE user_id = $1 AND used = true AND expires_at > NOW())",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }
}
