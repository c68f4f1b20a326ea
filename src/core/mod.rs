//! Core business logic for kinsync.
//!
//! This module contains the bulk engine that sits between callers and the
//! record store.
//!
//! # Modules
//!
//! - [`bulk`] - Chunking, the concurrency gate, retry, and chunked writes
//! - [`read`] - Offset-paged and cursor reads
//! - [`upsert`] - Key lookup and create-or-update reconciliation
//! - [`repository`] - The façade tying them together
//!
//! # Bulk Workflow
//!
//! A typical bulk write:
//!
//! 1. **Chunk**: Split the input into batches of at most 100 records
//! 2. **Fan out**: Start one call per chunk under a child cancellation token
//! 3. **Gate**: Each call waits for a permit from the repository's gate
//! 4. **Retry**: Failed calls are repeated at a fixed interval
//! 5. **Collect**: Results are reassembled in chunk order; the first error
//!    cancels the remaining chunks
//!
//! # Example
//!
//! ```rust,no_run
//! use kinsync::config::load_config;
//! use kinsync::core::Repository;
//! use kinsync::domain::{AppId, FieldValue, KeySelector, Record};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("kinsync.toml")?;
//! let repository = Repository::from_config(&config)?;
//!
//! let records: Vec<Record> = (1..=250)
//!     .map(|n| Record::new().field("code", FieldValue::text(format!("C-{n}"))))
//!     .collect();
//!
//! let cancel = CancellationToken::new();
//! let summary = repository
//!     .upsert_many(&cancel, AppId::new(12)?, &KeySelector::from("code"), &records)
//!     .await?;
//!
//! println!("Created: {}", summary.created.len());
//! println!("Updated: {}", summary.updated);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod read;
pub mod repository;
pub mod upsert;

pub use repository::Repository;
pub use upsert::UpsertSummary;
