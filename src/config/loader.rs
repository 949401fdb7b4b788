//! Configuration loading from disk and the environment.
//!
//! The TOML file is optional and only tunes behaviour. Service base
//! addresses, the listener address and the store credentials come from the
//! deployment environment and always win over file values.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the optional TOML file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting {0}")]
    Missing(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, resolve and validate configuration.
///
/// `env` looks up a variable by name; `main` passes the process environment
/// and tests pass a map.
pub fn load_config<F>(path: Option<&Path>, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, &env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_env<F>(config: &mut GatewayConfig, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = env("GATEWAY_SERVICE_HOST");
    let port = env("GATEWAY_SERVICE_PORT");
    if host.is_some() || port.is_some() {
        let (default_host, default_port) = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| ("0.0.0.0".to_string(), "5000".to_string()));
        let port = port.unwrap_or(default_port);
        port.parse::<u16>().map_err(|e| ConfigError::Invalid {
            key: "GATEWAY_SERVICE_PORT".to_string(),
            reason: e.to_string(),
        })?;
        config.listener.bind_address = format!("{}:{}", host.unwrap_or(default_host), port);
    }

    for service in &mut config.services {
        let key = service.url_env_key();
        if let Some(url) = env(&key) {
            service.base_url = url.trim_end_matches('/').to_string();
        } else if service.base_url.is_empty() {
            return Err(ConfigError::Missing(key));
        }
    }

    let store = &mut config.store;
    if let Some(url) = env("DATABASE_URL") {
        store.url = Some(url);
    }
    if let Some(host) = env("PGHOST") {
        store.host = Some(host);
    }
    if let Some(port) = env("PGPORT") {
        let port = port.parse::<u16>().map_err(|e| ConfigError::Invalid {
            key: "PGPORT".to_string(),
            reason: e.to_string(),
        })?;
        store.port = Some(port);
    }
    if let Some(user) = env("PGUSER") {
        store.user = Some(user);
    }
    if let Some(password) = env("PGPASSWORD") {
        store.password = Some(password);
    }
    if let Some(database) = env("PGDATABASE") {
        store.database = Some(database);
    }

    if store.url.is_none() {
        let required = [
            ("PGHOST", store.host.is_some()),
            ("PGPORT", store.port.is_some()),
            ("PGUSER", store.user.is_some()),
            ("PGPASSWORD", store.password.is_some()),
            ("PGDATABASE", store.database.is_some()),
        ];
        if let Some((key, _)) = required.iter().find(|(_, present)| !present) {
            return Err(ConfigError::Missing(format!("{} (or DATABASE_URL)", key)));
        }
    }

    Ok(())
}
