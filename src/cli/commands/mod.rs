//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod delete;
pub mod read;
pub mod upsert;
pub mod validate;

use crate::config::load_config;
use crate::core::Repository;
use crate::domain::SyncError;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for fatal errors
pub const EXIT_FATAL: i32 = 5;

/// Loads and validates the configuration and builds a repository from it.
///
/// Failures are reported to the user; the error carries the exit code.
pub(crate) fn open_repository(config_path: &str) -> Result<Repository, i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, config_path, "Failed to load configuration");
            eprintln!("Failed to load configuration: {e}");
            return Err(EXIT_CONFIG);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("Configuration validation failed: {e}");
        return Err(EXIT_CONFIG);
    }

    Repository::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to create repository");
        eprintln!("Failed to initialize kintone client: {e}");
        exit_code(&e)
    })
}

/// Exit code for an operation failure
pub(crate) fn exit_code(err: &SyncError) -> i32 {
    match err {
        SyncError::Configuration(_) => EXIT_CONFIG,
        _ => EXIT_FATAL,
    }
}

/// Reports a failed operation and returns its exit code
pub(crate) fn report_failure(operation: &str, err: &SyncError) -> i32 {
    if err.is_canceled() {
        tracing::warn!(operation, "Operation cancelled");
        eprintln!("{operation} cancelled");
    } else {
        tracing::error!(operation, error = %err, "Operation failed");
        eprintln!("{operation} failed: {err}");
    }
    exit_code(err)
}
