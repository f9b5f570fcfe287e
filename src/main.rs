use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wavy_api::config::config;
use wavy_api::database::DatabaseManager;
use wavy_api::services::mailer_from_config;
use wavy_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config().clone();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Wavy API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    if config.email.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY not set, outgoing emails will only be logged");
    }
    let mailer = mailer_from_config(&config.email);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(pool, config, mailer);
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Wavy API listening on http://{}", bind_addr);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
