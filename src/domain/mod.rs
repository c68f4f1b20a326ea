//! Domain models and types for kinsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`AppId`], [`RecordId`])
//! - **Records and typed field values** ([`Record`], [`Fields`], [`FieldValue`])
//! - **Read queries** ([`Query`], [`Condition`])
//! - **Error types** ([`SyncError`], [`TransportError`], [`RemoteApiError`])
//! - **Result type alias** ([`Result`])
//!
//! # Records
//!
//! Records keep the store's type tags, so a record read from one app can be
//! written back without losing the field kinds:
//!
//! ```rust
//! use kinsync::domain::{FieldValue, Record};
//!
//! let record = Record::new()
//!     .field("code", FieldValue::text("A-1"))
//!     .field("qty", FieldValue::number(3.0));
//!
//! let json = serde_json::to_value(&record).unwrap();
//! assert_eq!(json["qty"]["type"], "NUMBER");
//! assert_eq!(json["qty"]["value"], "3");
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust
//! use kinsync::domain::{AppId, Result, SyncError};
//!
//! fn parse_app(raw: u64) -> Result<AppId> {
//!     AppId::new(raw).map_err(SyncError::Validation)
//! }
//!
//! assert!(parse_app(0).is_err());
//! ```

pub mod errors;
pub mod field;
pub mod ids;
pub mod key;
pub mod query;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{RemoteApiError, SyncError, TransportError};
pub use field::{Entity, FieldValue, Fields, FileInfo, SubtableRow, WriteFields};
pub use ids::{AppId, RecordId};
pub use key::KeySelector;
pub use query::{Condition, Query};
pub use record::Record;
pub use result::Result;
