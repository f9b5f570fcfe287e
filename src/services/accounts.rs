use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::database::models::user::SessionUser;
use crate::auth::primary_role;
use crate::error::ApiError;
use crate::types::Role;

pub async fn email_exists<'c, E: PgExecutor<'c>>(executor: E, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
        .bind(email)
        .fetch_one(executor)
        .await
}

/// Insert the credential row and its profile. Run inside a transaction; the
/// caller has already hashed the password.
pub async fn create_account(
    conn: &mut PgConnection,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    duplicate_message: &str,
) -> Result<Uuid, ApiError> {
    if email_exists(&mut *conn, email).await? {
        return Err(ApiError::conflict(duplicate_message));
    }

    let user_id: Uuid =
        sqlx::query_scalar("INSERT INTO users (email, encrypted_password) VALUES ($1, $2) RETURNING id")
            .bind(email)
            .bind(password_hash)
            .fetch_one(&mut *conn)
            .await?;

    sqlx::query("INSERT INTO profiles (id, email, full_name) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .execute(&mut *conn)
        .await?;

    tracing::info!("Account {} created", user_id);
    Ok(user_id)
}

pub async fn grant_role<'c, E: PgExecutor<'c>>(executor: E, user_id: Uuid, role: Role) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(role.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn revoke_role<'c, E: PgExecutor<'c>>(executor: E, user_id: Uuid, role: Role) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
        .bind(user_id)
        .bind(role.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Roles in grant order
pub async fn load_roles<'c, E: PgExecutor<'c>>(executor: E, user_id: Uuid) -> Result<Vec<Role>, sqlx::Error> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY created_at, role")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
    Ok(Role::parse_all(rows))
}

pub fn session_user(id: Uuid, email: String, roles: Vec<Role>) -> SessionUser {
    SessionUser {
        id,
        email,
        role: primary_role(&roles),
        roles,
    }
}
