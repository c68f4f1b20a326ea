//! Configuration schema types
//!
//! Maps the sections of `kinsync.toml` onto typed structs. Every section has a
//! `validate()` returning a human readable message on failure.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main kinsync configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinsyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// kintone connection settings
    pub kintone: KintoneConfig,

    /// Bulk operation tuning
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KinsyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.kintone.validate()?;
        self.bulk.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// kintone connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KintoneConfig {
    /// Full base URL (e.g. `https://example.cybozu.com`); wins over `subdomain`
    #[serde(default)]
    pub base_url: Option<String>,

    /// cybozu.com subdomain, expanded to `https://{subdomain}.cybozu.com`
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Login name sent in `X-Cybozu-Authorization`
    pub username: String,

    /// Password sent in `X-Cybozu-Authorization`
    /// Stored securely in memory and automatically zeroized on drop
    pub password: SecretString,

    /// Optional HTTP basic auth user (for domains behind basic auth)
    #[serde(default)]
    pub basic_auth_user: Option<String>,

    /// Optional HTTP basic auth password
    #[serde(default)]
    pub basic_auth_password: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl KintoneConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        match (&self.base_url, &self.subdomain) {
            (Some(url), _) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("kintone.base_url must start with http:// or https://".to_string());
                }
            }
            (None, Some(subdomain)) => {
                if subdomain.is_empty() || subdomain.contains('/') || subdomain.contains('.') {
                    return Err(format!(
                        "Invalid kintone.subdomain '{subdomain}'. Use base_url for custom domains"
                    ));
                }
            }
            (None, None) => {
                return Err("Either kintone.base_url or kintone.subdomain is required".to_string());
            }
        }

        if self.username.is_empty() {
            return Err("kintone.username cannot be empty".to_string());
        }

        if self.password.expose_secret().is_empty() {
            return Err("kintone.password cannot be empty".to_string());
        }

        if self.basic_auth_user.is_some() != self.basic_auth_password.is_some() {
            return Err(
                "kintone.basic_auth_user and kintone.basic_auth_password must be set together"
                    .to_string(),
            );
        }

        if self.timeout_seconds == 0 {
            return Err("kintone.timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }

    /// Resolved base URL without a trailing slash
    pub fn endpoint_base(&self) -> String {
        match (&self.base_url, &self.subdomain) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(subdomain)) => format!("https://{subdomain}.cybozu.com"),
            (None, None) => String::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Which failures the bulk retry loop repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RetryOn {
    /// Retry every failure except cancellation and input errors
    #[default]
    #[serde(rename = "any")]
    AnyError,

    /// Retry only transport failures; structured rejections surface at once
    #[serde(rename = "transport")]
    TransportOnly,
}

impl fmt::Display for RetryOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOn::AnyError => write!(f, "any"),
            RetryOn::TransportOnly => write!(f, "transport"),
        }
    }
}

/// Bulk operation tuning
///
/// One `BulkConfig` parameterizes one repository: its concurrency gate, its
/// retry policy and the chunk/page sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Remote calls allowed in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts after the first failure of a write
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Retry classification
    #[serde(default)]
    pub retry_on: RetryOn,

    /// Records per add/update/delete call (API maximum 100)
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,

    /// Records per read call (API maximum 500)
    #[serde(default = "default_read_page_size")]
    pub read_page_size: u32,
}

impl BulkConfig {
    /// Maximum records per write call accepted by the API
    pub const MAX_WRITE_CHUNK: usize = 100;

    /// Maximum records per read call accepted by the API
    pub const MAX_READ_PAGE: u32 = 500;

    /// Validates the bulk settings
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("bulk.max_concurrent must be > 0".to_string());
        }

        if self.write_chunk_size == 0 || self.write_chunk_size > Self::MAX_WRITE_CHUNK {
            return Err(format!(
                "bulk.write_chunk_size must be between 1 and {}",
                Self::MAX_WRITE_CHUNK
            ));
        }

        if self.read_page_size == 0 || self.read_page_size > Self::MAX_READ_PAGE {
            return Err(format!(
                "bulk.read_page_size must be between 1 and {}",
                Self::MAX_READ_PAGE
            ));
        }

        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_on: RetryOn::default(),
            write_chunk_size: default_write_chunk_size(),
            read_page_size: default_read_page_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (minutely, hourly, daily, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Emit console logs as JSON instead of the human readable format
    #[serde(default)]
    pub console_json: bool,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["minutely", "hourly", "daily", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err(
                "logging.local_path cannot be empty when local logging is enabled".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            console_json: false,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_seconds() -> u64 {
    610
}

fn default_max_concurrent() -> usize {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    10_000
}

fn default_write_chunk_size() -> usize {
    BulkConfig::MAX_WRITE_CHUNK
}

fn default_read_page_size() -> u32 {
    BulkConfig::MAX_READ_PAGE
}

fn default_local_path() -> String {
    "/var/log/kinsync".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
