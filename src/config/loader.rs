//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{KinsyncConfig, RetryOn};
use super::secret::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`KinsyncConfig`]
/// 4. Applies environment variable overrides (`KINSYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use kinsync::config::load_config;
///
/// let config = load_config("kinsync.toml").expect("Failed to load config");
/// println!("{}", config.kintone.endpoint_base());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<KinsyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: KinsyncConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config
        .validate()
        .map_err(|e| SyncError::Configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Parses a numeric override, rejecting garbage instead of ignoring it
fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SyncError::Configuration(format!("Invalid value for {name}: '{value}'")))
}

/// Applies environment variable overrides using the `KINSYNC_*` prefix
///
/// Variables follow the pattern `KINSYNC_<SECTION>_<KEY>`, for example
/// `KINSYNC_KINTONE_PASSWORD` or `KINSYNC_BULK_MAX_CONCURRENT`.
fn apply_env_overrides(config: &mut KinsyncConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("KINSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // kintone overrides
    if let Some(val) = var("KINSYNC_KINTONE_BASE_URL") {
        config.kintone.base_url = Some(val);
    }
    if let Some(val) = var("KINSYNC_KINTONE_SUBDOMAIN") {
        config.kintone.subdomain = Some(val);
    }
    if let Some(val) = var("KINSYNC_KINTONE_USERNAME") {
        config.kintone.username = val;
    }
    if let Some(val) = var("KINSYNC_KINTONE_PASSWORD") {
        config.kintone.password = secret_string(val);
    }
    if let Some(val) = var("KINSYNC_KINTONE_BASIC_AUTH_USER") {
        config.kintone.basic_auth_user = Some(val);
    }
    if let Some(val) = var("KINSYNC_KINTONE_BASIC_AUTH_PASSWORD") {
        config.kintone.basic_auth_password = Some(secret_string(val));
    }
    if let Some(val) = var("KINSYNC_KINTONE_TIMEOUT_SECONDS") {
        config.kintone.timeout_seconds = parse_override("KINSYNC_KINTONE_TIMEOUT_SECONDS", &val)?;
    }

    // Bulk overrides
    if let Some(val) = var("KINSYNC_BULK_MAX_CONCURRENT") {
        config.bulk.max_concurrent = parse_override("KINSYNC_BULK_MAX_CONCURRENT", &val)?;
    }
    if let Some(val) = var("KINSYNC_BULK_MAX_RETRIES") {
        config.bulk.max_retries = parse_override("KINSYNC_BULK_MAX_RETRIES", &val)?;
    }
    if let Some(val) = var("KINSYNC_BULK_RETRY_INTERVAL_MS") {
        config.bulk.retry_interval_ms = parse_override("KINSYNC_BULK_RETRY_INTERVAL_MS", &val)?;
    }
    if let Some(val) = var("KINSYNC_BULK_RETRY_ON") {
        config.bulk.retry_on = match val.as_str() {
            "any" => RetryOn::AnyError,
            "transport" => RetryOn::TransportOnly,
            other => {
                return Err(SyncError::Configuration(format!(
                    "Invalid value for KINSYNC_BULK_RETRY_ON: '{other}'. Must be 'any' or 'transport'"
                )))
            }
        };
    }

    // Logging overrides
    if let Some(val) = var("KINSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Some(val) = var("KINSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
