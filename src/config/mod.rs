// region:    --- Imports
use std::{env, fmt::Display, str::FromStr};
use thiserror::Error;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub reset_database: bool,
    pub body_limit_bytes: usize,
}

impl Config {
    /// Load the service configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            port: try_load(&lookup, "PORT", "3000")?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            reset_database: try_load(&lookup, "RESET_DATABASE", "false")?,
            body_limit_bytes: try_load(&lookup, "BODY_LIMIT_BYTES", "2097152")?,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => {
            warn!("{:<12} --> {key} not set", "Config");
            Err(ConfigError::Missing(key))
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{:<12} --> {key} not set, using default: {default}", "Config");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}
// endregion: --- Config

// endregion: --- Tests
