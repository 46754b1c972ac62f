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
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
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

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let optional_non_empty = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("ARTINTEL_ENV", "development"))?;
    let log_level = or_default("ARTINTEL_LOG_LEVEL", "info");
    let metrics_path = PathBuf::from(or_default(
        "ARTINTEL_METRICS_PATH",
        "./config/metrics.yaml",
    ));

    let db_max_connections = parse_u32("ARTINTEL_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("ARTINTEL_DB_MIN_CONNECTIONS", "0")?;
    let db_acquire_timeout_secs = parse_u64("ARTINTEL_DB_ACQUIRE_TIMEOUT_SECS", "5")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "ARTINTEL_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds max connections {db_max_connections}"),
        ));
    }

    let ollama_url = or_default("OLLAMA_URL", "http://127.0.0.1:11434")
        .trim_end_matches('/')
        .to_string();
    let embed_model = or_default("EMBED_MODEL", "all-minilm:l12-v2");
    let llm_model = or_default("LLM_MODEL", "llama3.1");
    let llm_timeout_secs = parse_u64("ARTINTEL_LLM_TIMEOUT_SECS", "120")?;

    let articles_csv = optional_non_empty("ARTICLES_CSV").map(PathBuf::from);
    let auto_embed_limit = optional_non_empty("AUTO_EMBED_LIMIT")
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|e| invalid("AUTO_EMBED_LIMIT", e.to_string()))
        })
        .transpose()?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        metrics_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        ollama_url,
        embed_model,
        llm_model,
        llm_timeout_secs,
        articles_csv,
        auto_embed_limit,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ARTINTEL_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
