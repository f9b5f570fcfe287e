//! Lifecycle shared by the single-use token flows.
//!
//! A token is issued with an expiry, then either consumed exactly once or
//! rejected as unknown, expired or already processed. Consumption always goes
//! through a guarded `UPDATE/DELETE ... RETURNING`, so [`check`] only decides
//! which rejection to report; it never authorises the side effect by itself.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Otp,
    PasswordReset,
    Invitation,
    CraValidation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    Unknown,
    Expired,
    /// Terminal status already recorded
    AlreadyProcessed(String),
}

/// Statuses after which a token can no longer be consumed
const TERMINAL_STATUSES: &[&str] = &["approved", "rejected", "accepted", "expired", "revoked"];

/// Classify a stored token, expiry first, then terminal status
pub fn check(
    expires_at: Option<DateTime<Utc>>,
    status: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), TokenRejection> {
    match expires_at {
        Some(expiry) if expiry > now => {}
        _ => return Err(TokenRejection::Expired),
    }
    match status {
        Some(s) if TERMINAL_STATUSES.contains(&s) => Err(TokenRejection::AlreadyProcessed(s.to_string())),
        _ => Ok(()),
    }
}

impl TokenRejection {
    pub fn into_api_error(self, kind: TokenKind) -> ApiError {
        tracing::warn!("Rejected {:?} token: {:?}", kind, self);
        match kind {
            TokenKind::Otp => ApiError::workflow("Code invalide ou expiré", None, None),
            TokenKind::PasswordReset => ApiError::workflow("Token invalide ou expiré", None, None),
            TokenKind::Invitation => ApiError::not_found("Invitation invalide ou expirée"),
            TokenKind::CraValidation => match self {
                TokenRejection::Unknown => ApiError::workflow(
                    "Token invalide ou expiré",
                    Some("Ce lien de validation n'est plus valide.".to_string()),
                    None,
                ),
                TokenRejection::Expired => ApiError::workflow(
                    "Token expiré",
                    Some("Ce lien de validation a expiré.".to_string()),
                    None,
                ),
                TokenRejection::AlreadyProcessed(status) => {
                    let verb = if status == "approved" { "approuvé" } else { "rejeté" };
                    ApiError::workflow(
                        "Déjà traité",
                        Some(format!("Ce CRA a déjà été {}.", verb)),
                        Some(status),
                    )
                }
            },
        }
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct CleanupReport {
    pub otp_codes: u64,
    pub password_reset_tokens: u64,
    pub invitations_expired: u64,
}

/// Purge expired OTP codes and reset tokens, and close stale invitations
pub async fn cleanup_expired(pool: &PgPool) -> Result<CleanupReport, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let otp_codes = sqlx::query("DELETE FROM otp_codes WHERE expires_at < NOW()")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let password_reset_tokens = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < NOW()")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let invitations_expired = sqlx::query(
        "UPDATE user_invitations SET status = 'expired', updated_at = NOW() \
         WHERE status = 'pending' AND expires_at < NOW()",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    let report = CleanupReport {
        otp_codes,
        password_reset_tokens,
        invitations_expired,
    };
    tracing::info!("Token cleanup: {:?}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn live_token_passes() {
        let now = Utc::now();
        assert_eq!(check(Some(now + Duration::minutes(5)), Some("sent"), now), Ok(()));
        assert_eq!(check(Some(now + Duration::minutes(5)), None, now), Ok(()));
    }

    #[test]
    fn expiry_is_reported_before_terminal_status() {
        let now = Utc::now();
        assert_eq!(
            check(Some(now - Duration::seconds(1)), Some("approved"), now),
            Err(TokenRejection::Expired)
        );
        assert_eq!(check(None, None, now), Err(TokenRejection::Expired));
    }

    #[test]
    fn terminal_status_is_already_processed() {
        let now = Utc::now();
        assert_eq!(
            check(Some(now + Duration::days(1)), Some("rejected"), now),
            Err(TokenRejection::AlreadyProcessed("rejected".to_string()))
        );
    }

    #[test]
    fn cra_rejections_carry_french_messages() {
        let body = TokenRejection::AlreadyProcessed("approved".to_string())
            .into_api_error(TokenKind::CraValidation)
            .to_json();
        assert_eq!(body["error"], "Déjà traité");
        assert_eq!(body["message"], "Ce CRA a déjà été approuvé.");
        assert_eq!(body["status"], "approved");

        let body = TokenRejection::Unknown.into_api_error(TokenKind::CraValidation).to_json();
        assert_eq!(body["error"], "Token invalide ou expiré");
        assert_eq!(body["message"], "Ce lien de validation n'est plus valide.");

        let err = TokenRejection::Expired.into_api_error(TokenKind::Invitation);
        assert_eq!(err.status_code(), 404);
    }
}
