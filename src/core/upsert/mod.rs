//! Upsert reconciliation
//!
//! - [`key`] - remote key lookup results
//! - [`reconciler`] - planning and the concurrent create/update write

pub mod key;
pub mod reconciler;

pub use key::ExistingKeySet;
pub use reconciler::{plan, Reconciler, UpsertPlan, UpsertSummary, LOOKUP_CHUNK};
