//! Single-chunk remote calls
//!
//! [`BatchExecutor`] performs one add, update or delete for one chunk. It takes
//! a permit from the shared gate, encodes the chunk once, sends it through the
//! retry policy and decodes the answer. Reads go through the same gate but are
//! not retried.
//!
//! Retrying an add is not idempotent: if the store committed a chunk but the
//! response was lost, the retry adds the records again.

use super::gate::ConcurrencyGate;
use super::retry::RetryPolicy;
use crate::adapters::kintone::models::{
    AddRecordsRequest, AddRecordsResponse, DeleteRecordsRequest, RecordsResponse, UpdateEntry,
    UpdateKey, UpdateRecordsRequest,
};
use crate::adapters::kintone::{Endpoint, Transport};
use crate::domain::{
    AppId, KeySelector, Query, Record, RecordId, Result, SyncError, TransportError, WriteFields,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP verb of a JSON call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One chunk-sized write
#[derive(Debug, Clone, Copy)]
pub enum BatchOperation<'a> {
    /// Create the records; ids come back in input order
    Add(&'a [&'a Record]),
    /// Update the records, addressed by id or by a key field
    Update {
        records: &'a [&'a Record],
        key: &'a KeySelector,
    },
    /// Delete the records with these ids
    Delete(&'a [RecordId]),
}

impl BatchOperation<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            BatchOperation::Add(_) => "add",
            BatchOperation::Update { .. } => "update",
            BatchOperation::Delete(_) => "delete",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BatchOperation::Add(records) | BatchOperation::Update { records, .. } => records.len(),
            BatchOperation::Delete(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a successful chunk call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Added(Vec<RecordId>),
    Updated(usize),
    Deleted(usize),
}

/// Executes chunk calls against one transport under one gate
#[derive(Clone)]
pub struct BatchExecutor {
    transport: Arc<dyn Transport>,
    gate: ConcurrencyGate,
    retry: RetryPolicy,
}

impl BatchExecutor {
    pub fn new(transport: Arc<dyn Transport>, gate: ConcurrencyGate, retry: RetryPolicy) -> Self {
        Self {
            transport,
            gate,
            retry,
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs one write for one chunk.
    ///
    /// The permit is held across retries, so a chunk that is waiting to retry
    /// still counts against the gate.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        op: BatchOperation<'_>,
    ) -> Result<BatchOutcome> {
        let label = op.label();
        let (method, body) = encode(app, op)?;

        let _permit = self.gate.acquire(cancel).await?;
        tracing::debug!(
            app_id = app.get(),
            operation = label,
            records = op.len(),
            "Sending chunk"
        );

        let response = self
            .retry
            .run(cancel, label, |attempt| {
                let body = &body;
                async move {
                    tracing::trace!(operation = label, attempt, "Chunk attempt");
                    self.send(method, Endpoint::Records, body).await
                }
            })
            .await?;

        match op {
            BatchOperation::Add(records) => {
                let decoded: AddRecordsResponse = decode(&response)?;
                if decoded.ids.len() != records.len() {
                    return Err(TransportError::InvalidResponse(format!(
                        "add returned {} ids for {} records",
                        decoded.ids.len(),
                        records.len()
                    ))
                    .into());
                }
                Ok(BatchOutcome::Added(decoded.ids))
            }
            BatchOperation::Update { records, .. } => Ok(BatchOutcome::Updated(records.len())),
            BatchOperation::Delete(ids) => Ok(BatchOutcome::Deleted(ids.len())),
        }
    }

    /// Fetches one page of records. Not retried.
    pub async fn fetch_page(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<Vec<Record>> {
        let _permit = self.gate.acquire(cancel).await?;
        let body = self.transport.get(Endpoint::Records, query).await?;
        let decoded: RecordsResponse = decode(&body)?;
        Ok(decoded.records)
    }

    /// Number of records matching `query`
    pub async fn fetch_total_count(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<u64> {
        let _permit = self.gate.acquire(cancel).await?;
        let body = self
            .transport
            .get(Endpoint::Records, &query.count_only())
            .await?;
        let decoded: RecordsResponse = decode(&body)?;
        decoded.total_count.ok_or_else(|| {
            TransportError::InvalidResponse("response has no totalCount".to_string()).into()
        })
    }

    /// One gated call without retry
    pub async fn call(
        &self,
        cancel: &CancellationToken,
        method: Method,
        endpoint: Endpoint,
        body: &Value,
    ) -> Result<Vec<u8>> {
        let _permit = self.gate.acquire(cancel).await?;
        self.send(method, endpoint, body).await
    }

    async fn send(&self, method: Method, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        match method {
            Method::Get => self.transport.get_with_body(endpoint, body).await,
            Method::Post => self.transport.post(endpoint, body).await,
            Method::Put => self.transport.put(endpoint, body).await,
            Method::Delete => self.transport.delete(endpoint, body).await,
        }
    }
}

/// Builds the request body for one chunk
fn encode(app: AppId, op: BatchOperation<'_>) -> Result<(Method, Value)> {
    let app = app.get();
    match op {
        BatchOperation::Add(records) => {
            let request = AddRecordsRequest {
                app,
                records: records.iter().map(|r| WriteFields::new(&r.fields)).collect(),
            };
            Ok((Method::Post, serde_json::to_value(&request)?))
        }
        BatchOperation::Update { records, key } => {
            let entries = records
                .iter()
                .map(|record| update_entry(*record, key))
                .collect::<Result<Vec<_>>>()?;
            let request = UpdateRecordsRequest {
                app,
                records: entries,
            };
            Ok((Method::Put, serde_json::to_value(&request)?))
        }
        BatchOperation::Delete(ids) => {
            let request = DeleteRecordsRequest {
                app,
                ids: ids.iter().map(RecordId::as_str).collect(),
            };
            Ok((Method::Delete, serde_json::to_value(&request)?))
        }
    }
}

/// Addresses `record` by id or by key field; the key field itself is not sent.
pub(crate) fn update_entry<'a>(
    record: &'a Record,
    key: &'a KeySelector,
) -> Result<UpdateEntry<'a>> {
    match key {
        KeySelector::RecordId => {
            let id = record.id.as_ref().ok_or_else(|| {
                SyncError::Validation("record id is required to update by id".to_string())
            })?;
            Ok(UpdateEntry {
                id: Some(id.as_str()),
                update_key: None,
                record: WriteFields::new(&record.fields),
            })
        }
        KeySelector::Field(code) => {
            let value = key.key_of(record).ok_or_else(|| {
                SyncError::Validation(format!("record has no value for key field '{code}'"))
            })?;
            Ok(UpdateEntry {
                id: None,
                update_key: Some(UpdateKey {
                    field: code.clone(),
                    value,
                }),
                record: WriteFields::without(&record.fields, code),
            })
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        TransportError::InvalidResponse(format!("Failed to decode response: {e}")).into()
    })
}
