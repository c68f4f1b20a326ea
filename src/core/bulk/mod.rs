//! Bulk write machinery
//!
//! This module provides the pieces every bulk operation is built from:
//! - Chunking of inputs into store-sized batches
//! - A concurrency gate shared by all calls of one repository
//! - Fixed-interval retry
//! - The batch executor and the chunked writer on top of it

pub mod chunk;
pub mod executor;
pub mod gate;
pub mod retry;
pub mod writer;

pub use chunk::chunks;
pub use executor::{BatchExecutor, BatchOperation, BatchOutcome, Method};
pub use gate::{ConcurrencyGate, GatePermit};
pub use retry::RetryPolicy;
pub use writer::BulkWriter;

#[cfg(test)]
pub(crate) mod testing;
