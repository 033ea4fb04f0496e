//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then
/// environment overrides. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply the recognised environment variables on top of `config`.
///
/// `lookup` resolves a variable name to its value; the binary passes
/// `std::env::var`, tests pass a fixed table.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("RATE_LIMIT_PER_MINUTE") {
        config.rate_limit.per_minute = parse_env("RATE_LIMIT_PER_MINUTE", value)?;
    }
    if let Some(value) = lookup("RATE_LIMIT_PER_HOUR") {
        config.rate_limit.per_hour = parse_env("RATE_LIMIT_PER_HOUR", value)?;
    }
    if let Some(value) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(value) = lookup("PORT") {
        let port: u16 = parse_env("PORT", value)?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }
    if let Some(value) = lookup("LOG_LEVEL") {
        config.observability.log_level = value.trim().to_string();
    }
    if let Some(value) = lookup("LOG_FORMAT") {
        config.observability.log_format = parse_env::<LogFormat>("LOG_FORMAT", value)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
