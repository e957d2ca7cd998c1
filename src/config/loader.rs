//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables consulted for the backend base URL, in priority order.
pub const BASE_URL_VARS: [&str; 2] = ["GATE_BACKEND_URL", "SUPABASE_URL"];

/// Environment variables consulted for the backend anon key, in priority order.
pub const ANON_KEY_VARS: [&str; 2] = ["GATE_BACKEND_ANON_KEY", "SUPABASE_ANON_KEY"];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment
/// overrides.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GateConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment overrides, for runs
/// without a config file.
pub fn config_from_env() -> Result<GateConfig, ConfigError> {
    let mut config = GateConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay backend settings from the environment.
///
/// The lookup is injected so tests do not touch the process environment.
pub fn apply_env_overrides<F>(config: &mut GateConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first_set = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
    };

    if let Some(url) = first_set(&BASE_URL_VARS) {
        config.backend.base_url = url;
    }
    if let Some(key) = first_set(&ANON_KEY_VARS) {
        config.backend.anon_key = key;
    }
}
