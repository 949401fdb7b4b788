//! PostgreSQL reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::{ConfigError, StoreConfig};
use crate::store::{StoreError, StoreProbe};

/// Pings PostgreSQL with `SELECT 1` over a small lazy pool.
#[derive(Debug, Clone)]
pub struct PgStoreProbe {
    pool: PgPool,
}

impl PgStoreProbe {
    /// Build the pool without connecting; the first ping opens a connection.
    pub fn connect_lazy(config: &StoreConfig) -> Result<Self, ConfigError> {
        let options = connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect_lazy_with(options);

        tracing::debug!(
            max_connections = config.max_connections,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "Store pool configured"
        );

        Ok(Self { pool })
    }
}

/// Build `PgConnectOptions` from a URL, or from the discrete settings.
pub fn connect_options(config: &StoreConfig) -> Result<PgConnectOptions, ConfigError> {
    if let Some(url) = &config.url {
        return url.parse().map_err(|e: sqlx::Error| ConfigError::Invalid {
            key: "DATABASE_URL".to_string(),
            reason: e.to_string(),
        });
    }

    let mut options = PgConnectOptions::new();
    match &config.host {
        Some(host) => options = options.host(host),
        None => return Err(ConfigError::Missing("PGHOST (or DATABASE_URL)".to_string())),
    }
    if let Some(port) = config.port {
        options = options.port(port);
    }
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    Ok(options)
}

#[async_trait]
impl StoreProbe for PgStoreProbe {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                sqlx::Error::PoolTimedOut => StoreError::Timeout,
                other => StoreError::Unreachable(other.to_string()),
            })
    }
}
