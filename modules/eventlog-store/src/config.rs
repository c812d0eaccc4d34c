use std::env;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Postgres connection settings, passed explicitly to whoever opens the pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

    /// Load from `POSTGRES_*` environment variables (after reading `.env`).
    /// Fails on the first missing or malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DatabaseConfig::from_env`] with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let config = Self {
            host: required("POSTGRES_HOST")?,
            port: parse_number("POSTGRES_PORT", &required("POSTGRES_PORT")?)?,
            user: required("POSTGRES_USER")?,
            password: required("POSTGRES_PASSWORD")?,
            database: required("POSTGRES_DB")?,
            max_connections: match lookup("POSTGRES_MAX_CONNECTIONS") {
                Some(raw) => parse_number("POSTGRES_MAX_CONNECTIONS", &raw)?,
                None => Self::DEFAULT_MAX_CONNECTIONS,
            },
            acquire_timeout: Duration::from_secs(match lookup("POSTGRES_ACQUIRE_TIMEOUT_SECS") {
                Some(raw) => parse_number("POSTGRES_ACQUIRE_TIMEOUT_SECS", &raw)?,
                None => Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            }),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("POSTGRES_HOST", &self.host),
            ("POSTGRES_USER", &self.user),
            ("POSTGRES_PASSWORD", &self.password),
            ("POSTGRES_DB", &self.database),
        ];
        for (key, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "POSTGRES_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Disable)
    }

    /// Open a pool. The caller owns it and is responsible for closing it.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(self.connect_options())
            .await
    }

    pub fn log_redacted(&self) {
        tracing::info!(
            host = %self.host,
            port = self.port,
            user = %self.user,
            password = %redact(&self.password),
            database = %self.database,
            max_connections = self.max_connections,
            "Database config loaded"
        );
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}

fn redact(secret: &str) -> String {
    format!("<redacted>({} chars)", secret.len())
}
