use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::email::Mailer;

/// Shared handler state: the pool, the configuration and the mail transport
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            mailer,
        }
    }
}
