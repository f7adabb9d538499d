use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use crate::ai::AiClient;
use crate::auth::{PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::db::{create_db_pool, run_migrations};
use crate::repository::{InvoiceRepository, PgInvoiceRepository, PgUserRepository, UserRepository};

/// Shared application state, built once at startup and handed to every
/// handler as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub ai: AiClient,
}

impl AppState {
    /// Connects to Postgres, applies pending migrations and wires the
    /// Postgres repositories.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = create_db_pool(&config.database_url, &config.database)
            .await
            .context("failed to connect to the database")?;

        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;

        Self::from_parts(
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgInvoiceRepository::new(pool)),
            config,
        )
    }

    /// State over arbitrary repositories; tests pass the in-memory ones.
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let ai = AiClient::new(&config.ai).context("failed to build the AI HTTP client")?;
        if !ai.is_configured() {
            warn!("⚠️ OPENROUTER_API_KEY not set, AI routes will answer AI_NOT_CONFIGURED");
        }

        Ok(Self {
            users,
            invoices,
            tokens: TokenService::new(&config.auth.jwt_secret, config.auth.jwt_expiration_hours),
            passwords: PasswordHasher::new(config.auth.bcrypt_cost),
            ai,
        })
    }
}
