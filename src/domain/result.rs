//! Result type alias for kinsync

use super::errors::SyncError;

/// Result type alias for kinsync operations
///
/// # Examples
///
/// ```
/// use kinsync::domain::result::Result;
/// use kinsync::domain::errors::SyncError;
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Validation("app id is required".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
