use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let api_base_url = require("AURA_API_BASE_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "AURA_API_BASE_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_base_url}'"),
        });
    }
    let api_token = lookup("AURA_API_TOKEN").ok().filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("AURA_ENV", "development"))?;
    let log_level = or_default("AURA_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("AURA_REQUEST_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("AURA_USER_AGENT", "auraselect/0.1 (trial-desk)");
    let max_retries = parse_u32("AURA_MAX_RETRIES", "1")?;
    let retry_backoff_base_ms = parse_u64("AURA_RETRY_BACKOFF_BASE_MS", "250")?;

    let catalog_refresh_secs = parse_u64("AURA_CATALOG_REFRESH_SECS", "30")?;
    if catalog_refresh_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AURA_CATALOG_REFRESH_SECS".to_string(),
            reason: "refresh period must be at least 1 second".to_string(),
        });
    }
    let catalog_seed_path = PathBuf::from(or_default(
        "AURA_CATALOG_SEED_PATH",
        "./config/catalog.yaml",
    ));
    let settings_path = PathBuf::from(or_default(
        "AURA_SETTINGS_PATH",
        "./.auraselect/settings.json",
    ));

    Ok(AppConfig {
        api_base_url,
        api_token,
        env,
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        catalog_refresh_secs,
        catalog_seed_path,
        settings_path,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AURA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
