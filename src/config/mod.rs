//! Configuration management for kinsync.
//!
//! kinsync reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `KINSYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`KintoneConfig`] - Domain, credentials and timeout
//! - [`BulkConfig`] - Concurrency, retry policy and chunk sizes
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [kintone]
//! subdomain = "example"
//! username = "sync-user"
//! password = "${KINTONE_PASSWORD}"
//!
//! [bulk]
//! max_concurrent = 4
//! max_retries = 3
//! retry_interval_ms = 10000
//! retry_on = "any"
//! ```
//!
//! # Loading
//!
//! ```rust,no_run
//! use kinsync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("kinsync.toml")?;
//! println!("kintone: {}", config.kintone.endpoint_base());
//! println!("max concurrent calls: {}", config.bulk.max_concurrent);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BulkConfig, KinsyncConfig, KintoneConfig, LoggingConfig, RetryOn,
};
pub use secret::{secret_string, SecretString, SecretValue};
