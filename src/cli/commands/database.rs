use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::tokens;

pub async fn migrate(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    DatabaseManager::migrate(&pool).await?;
    output_success(&output_format, "Migrations applied", None)
}

/// Token rows past their lifetime
pub async fn cleanup_tokens(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let report = tokens::cleanup_expired(&pool).await?;

    let message = format!(
        "Removed {} OTP code(s) and {} reset token(s), expired {} invitation(s)",
        report.otp_codes, report.password_reset_tokens, report.invitations_expired
    );
    output_success(&output_format, &message, Some(json!({ "cleanup": report })))
}
