use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; leadq/0.1; +lead-qualification)";

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
/// Decoupled from the process environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("LEADQ_ENV", "development"));
    let bind_addr = parse_addr("LEADQ_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LEADQ_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LEADQ_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADQ_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEADQ_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let target_hashtags = parse_list(&or_default("LEADQ_TARGET_HASHTAGS", ""));
    let seed_usernames = parse_list(&or_default("LEADQ_SEED_USERNAMES", ""));
    let targets_path = optional_path("LEADQ_TARGETS_PATH");
    let discovery_snapshot_path = optional_path("LEADQ_DISCOVERY_SNAPSHOT_PATH");

    let discovery_limit_per_source = parse_usize("LEADQ_DISCOVERY_LIMIT_PER_SOURCE", "20")?;
    let enrich_batch_size = parse_usize("LEADQ_ENRICH_BATCH_SIZE", "20")?;
    let max_workers = parse_usize("LEADQ_MAX_WORKERS", "4")?;
    let fetch_timeout_secs = parse_u64("LEADQ_FETCH_TIMEOUT_SECS", "15")?;
    let source_timeout_secs = parse_u64("LEADQ_SOURCE_TIMEOUT_SECS", "60")?;
    let job_budget_secs = parse_u64("LEADQ_JOB_BUDGET_SECS", "600")?;
    let user_agent = or_default("LEADQ_USER_AGENT", DEFAULT_USER_AGENT);

    let discover_cron = or_default("LEADQ_DISCOVER_CRON", "0 0 */6 * * *");
    let enrich_cron = or_default("LEADQ_ENRICH_CRON", "0 30 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        target_hashtags,
        seed_usernames,
        targets_path,
        discovery_snapshot_path,
        discovery_limit_per_source,
        enrich_batch_size,
        max_workers,
        fetch_timeout_secs,
        source_timeout_secs,
        job_budget_secs,
        user_agent,
        discover_cron,
        enrich_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Split a comma-separated env value, dropping blank entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
