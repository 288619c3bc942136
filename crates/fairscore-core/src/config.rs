use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, Platform};

const MAX_EXTRACT_BATCH_SIZE: usize = 50;

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
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FAIRSCORE_ENV", "development"))?;
    let log_level = or_default("FAIRSCORE_LOG_LEVEL", "info");
    let accounts_path = PathBuf::from(or_default(
        "FAIRSCORE_ACCOUNTS_PATH",
        "./config/accounts.yaml",
    ));

    let db_max_connections = parse_u32("FAIRSCORE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FAIRSCORE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FAIRSCORE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let reporting_tz = or_default("FAIRSCORE_REPORTING_TZ", "Asia/Jakarta");
    let default_platforms =
        parse_platforms(&or_default("FAIRSCORE_DEFAULT_PLATFORMS", "instagram,tiktok"))?;

    let extract_batch_size = parse_usize("FAIRSCORE_EXTRACT_BATCH_SIZE", "10")?;
    if extract_batch_size == 0 || extract_batch_size > MAX_EXTRACT_BATCH_SIZE {
        return Err(ConfigError::InvalidEnvVar {
            var: "FAIRSCORE_EXTRACT_BATCH_SIZE".to_string(),
            reason: format!("must be between 1 and {MAX_EXTRACT_BATCH_SIZE}"),
        });
    }

    let optional = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

    let source_base_url = optional("FAIRSCORE_SOURCE_BASE_URL");
    let source_api_key = optional("FAIRSCORE_SOURCE_API_KEY");
    let source_timeout_secs = parse_u64("FAIRSCORE_SOURCE_TIMEOUT_SECS", "30")?;
    let source_user_agent = or_default(
        "FAIRSCORE_SOURCE_USER_AGENT",
        "fairscore/0.1 (engagement-metrics)",
    );
    let source_max_retries = parse_u32("FAIRSCORE_SOURCE_MAX_RETRIES", "2")?;
    let source_retry_backoff_ms = parse_u64("FAIRSCORE_SOURCE_RETRY_BACKOFF_MS", "3000")?;
    let schedule_cron = or_default("FAIRSCORE_SCHEDULE_CRON", "0 0 1 * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        accounts_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        reporting_tz,
        default_platforms,
        extract_batch_size,
        source_base_url,
        source_api_key,
        source_timeout_secs,
        source_user_agent,
        source_max_retries,
        source_retry_backoff_ms,
        schedule_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FAIRSCORE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse a comma-separated platform list, skipping blanks and duplicates.
fn parse_platforms(raw: &str) -> Result<Vec<Platform>, ConfigError> {
    let mut platforms = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let platform = part
            .parse::<Platform>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "FAIRSCORE_DEFAULT_PLATFORMS".to_string(),
                reason: e.to_string(),
            })?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    if platforms.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "FAIRSCORE_DEFAULT_PLATFORMS".to_string(),
            reason: "at least one platform is required".to_string(),
        });
    }
    Ok(platforms)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
