//! Domain error types
//!
//! This module defines the error hierarchy for kinsync. Transport-level failures,
//! structured rejections from the record store, and orchestration failures
//! (cancellation, ambiguous upsert keys) are kept apart so the retry policy can
//! tell them apart. No third-party error types leak through the public API.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Main kinsync error type
///
/// This is the primary error type used throughout the crate. Bulk operations
/// return the first error raised by any of their concurrent branches.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The operation's cancellation token fired while it was queued or waiting
    #[error("Operation canceled")]
    Canceled,

    /// Network, timeout or other transport-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Structured rejection returned by the record store
    #[error("Remote API error: {0}")]
    RemoteApi(#[from] RemoteApiError),

    /// An upsert key resolved to more than one target
    #[error("Ambiguous upsert key {field}={value}: {reason}")]
    AmbiguousKey {
        /// Field code used as the key (`$id` for record ids)
        field: String,
        /// Key value that was ambiguous
        value: String,
        /// Why the key is ambiguous
        reason: String,
    },

    /// Missing identifier, key, or otherwise invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl SyncError {
    /// Returns true for failures raised below the HTTP semantics layer
    /// (connection drops, timeouts, unreadable responses).
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    /// Returns true when the error came from cancellation
    pub fn is_canceled(&self) -> bool {
        matches!(self, SyncError::Canceled)
    }

    /// Returns true if repeating the same call could succeed.
    ///
    /// Cancellation and caller-side input errors never are.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SyncError::Canceled
                | SyncError::Validation(_)
                | SyncError::AmbiguousKey { .. }
                | SyncError::Configuration(_)
        )
    }

    /// Shorthand for an ambiguous key error
    pub fn ambiguous_key(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SyncError::AmbiguousKey {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Transport-level errors
///
/// Errors raised while talking to the record store that carry no structured
/// rejection from the server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect or the connection dropped
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-success status with a body that is not a structured API error
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Response body could not be read or decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be built (bad URL, bad header value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Structured error body returned by the record store
///
/// kintone answers failed calls with `{"code", "id", "message", "errors"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteApiError {
    /// HTTP status code of the response
    #[serde(skip)]
    pub status: u16,

    /// Machine-readable error code (e.g. `GAIA_RE01`)
    #[serde(default)]
    pub code: String,

    /// Unique id the server assigned to this error
    #[serde(default)]
    pub id: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Per-field details, if any
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl fmt::Display for RemoteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.status, self.code, self.message, self.id
        )?;
        if let Some(errors) = &self.errors {
            write!(f, " {errors}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteApiError {}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
