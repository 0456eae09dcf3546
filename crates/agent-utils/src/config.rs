//! Configuration management utilities

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when an environment value cannot be parsed
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The variable is set but its value is not acceptable
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// JSON lines, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Process-level configuration shared by binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "fin-analyst".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Read `APP_NAME`, `APP_ENV`, `LOG_FORMAT` and `LOG_LEVEL`, keeping
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            app_name: env_or("APP_NAME", &defaults.app_name),
            environment: env_or("APP_ENV", &defaults.environment),
            log_format: env_parse("LOG_FORMAT")?.unwrap_or(defaults.log_format),
            log_filter: env_or("LOG_LEVEL", &defaults.log_filter),
        })
    }

    /// Whether this process runs in production
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Value of `key`, or `default` when unset or empty
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Parse `key` when it is set.
///
/// Returns `Ok(None)` for an unset or empty variable and an error for a value
/// that does not parse.
pub fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })
}
