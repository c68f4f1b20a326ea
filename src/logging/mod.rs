//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Plain or JSON console output
//! - Configurable log levels
//! - Local JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use kinsync::logging::init_logging;
//! use kinsync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a bulk operation
///
/// # Example
///
/// ```no_run
/// use kinsync::log_operation_start;
///
/// log_operation_start!("add_many", Some(250usize));
/// ```
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr, $records:expr) => {
        tracing::info!(
            operation = $operation,
            records = $records,
            "Starting operation"
        )
    };
}

/// Log the completion of a bulk operation
///
/// # Example
///
/// ```no_run
/// use kinsync::log_operation_complete;
/// use std::time::Duration;
///
/// log_operation_complete!("delete_many", 42usize, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_operation_complete {
    ($operation:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            duration_ms = $duration.as_millis() as u64,
            "Operation completed"
        )
    };
}

/// Log the outcome of one chunk of a bulk write
///
/// # Example
///
/// ```no_run
/// use kinsync::log_chunk_result;
///
/// let result: Result<(), String> = Ok(());
/// log_chunk_result!("add", 2, 3, 100usize, &result);
/// ```
#[macro_export]
macro_rules! log_chunk_result {
    ($operation:expr, $chunk:expr, $chunks:expr, $records:expr, $result:expr) => {
        match $result {
            Ok(_) => tracing::debug!(
                operation = $operation,
                chunk = $chunk,
                chunks = $chunks,
                records = $records,
                "Chunk written"
            ),
            Err(err) => tracing::debug!(
                operation = $operation,
                chunk = $chunk,
                chunks = $chunks,
                records = $records,
                error = %err,
                "Chunk failed"
            ),
        }
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use kinsync::log_retry_attempt;
///
/// log_retry_attempt!(2, 4, "update", "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $operation:expr, $error:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            operation = $operation,
            error = %$error,
            "Retrying operation"
        )
    };
}
