//! Configuration loaded from the process environment.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::db::DatabaseConfig;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24 * 7;
pub const DEFAULT_AI_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_AI_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime environment, taken from `NODE_ENV` so existing deployments keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Environment::Test)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// `None` keeps the AI routes mounted but answering `AI_NOT_CONFIGURED`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    pub database_url: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let environment = var("NODE_ENV")
            .map(|raw| Environment::parse(&raw))
            .unwrap_or(Environment::Development);

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database = match environment {
            Environment::Production => DatabaseConfig::production(),
            _ => DatabaseConfig::development(),
        };

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt_expiration_hours = match var("JWT_EXPIRATION_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "JWT_EXPIRATION_HOURS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_JWT_EXPIRATION_HOURS,
        };

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(cost) if (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BCRYPT_COST",
                        value: raw,
                    })
                }
            },
            None => bcrypt::DEFAULT_COST,
        };

        let ai_timeout_secs = match var("AI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "AI_TIMEOUT_SECS",
                value: raw,
            })?,
            None => DEFAULT_AI_TIMEOUT_SECS,
        };

        Ok(AppConfig {
            port,
            environment,
            database_url,
            database,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiration_hours,
                bcrypt_cost,
            },
            ai: AiConfig {
                api_key: var("OPENROUTER_API_KEY"),
                base_url: var("AI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
                model: var("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
                timeout: Duration::from_secs(ai_timeout_secs),
            },
        })
    }
}
