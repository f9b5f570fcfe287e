use anyhow::{anyhow, bail};
use serde_json::json;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::accounts;
use crate::types::Role;

const MIN_PASSWORD_LEN: usize = 6;

pub async fn create_admin(
    config: &AppConfig,
    email: &str,
    password: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let email = email.trim();
    if !email.contains('@') {
        bail!("'{}' is not an email address", email);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let pool = connect(config).await?;
    let hashed = hash_password(password, config.security.bcrypt_cost).await?;

    let mut tx = pool.begin().await?;
    let user_id = accounts::create_account(&mut tx, email, &hashed, None, "Email déjà utilisé").await?;
    accounts::grant_role(&mut *tx, user_id, Role::Admin).await?;
    tx.commit().await?;

    output_success(
        &output_format,
        &format!("Admin {} created", email),
        Some(json!({ "user": { "id": user_id, "email": email } })),
    )
}

pub async fn grant_role(
    config: &AppConfig,
    email: &str,
    role: Role,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(&pool)
        .await?;
    let user_id = user_id.ok_or_else(|| anyhow!("No account for '{}'", email))?;

    accounts::grant_role(&pool, user_id, role).await?;
    output_success(
        &output_format,
        &format!("Role {} granted to {}", role, email),
        Some(json!({ "user_id": user_id, "role": role })),
    )
}
