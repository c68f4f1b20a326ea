//! Transport seam between the bulk engine and the wire
//!
//! The bulk engine never touches HTTP directly. It calls a [`Transport`],
//! which returns the raw response body or a typed error. [`KintoneClient`]
//! is the reqwest implementation; tests substitute an in-memory store.
//!
//! [`KintoneClient`]: super::KintoneClient

use crate::domain::{Query, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// REST endpoints used by the bulk engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/k/v1/record.json` (single record)
    Record,
    /// `/k/v1/records.json` (up to 100 writes / 500 reads)
    Records,
    /// `/k/v1/records/cursor.json`
    RecordsCursor,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Record => "/k/v1/record.json",
            Endpoint::Records => "/k/v1/records.json",
            Endpoint::RecordsCursor => "/k/v1/records/cursor.json",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Authenticated access to the record store
///
/// Every method returns the response body of a successful call. Failures are
/// either [`SyncError::Transport`] (the call never produced a usable answer)
/// or [`SyncError::RemoteApi`] (the store rejected it).
///
/// [`SyncError::Transport`]: crate::domain::SyncError::Transport
/// [`SyncError::RemoteApi`]: crate::domain::SyncError::RemoteApi
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET with the query encoded as URL parameters
    async fn get(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<u8>>;

    /// GET with a JSON body
    async fn get_with_body(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>>;

    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>>;

    async fn put(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>>;

    async fn delete(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>>;
}
