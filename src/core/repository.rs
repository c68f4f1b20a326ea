//! Repository façade
//!
//! [`Repository`] owns one transport, one concurrency gate and one retry
//! policy, and exposes every bulk and single-record operation on top of them.
//! All calls made through one repository share its gate, so
//! `max_concurrent` bounds the number of requests in flight across every
//! operation running on it.

use crate::adapters::kintone::models::{AddRecordRequest, AddRecordResponse, UpdateRecordRequest};
use crate::adapters::kintone::{Endpoint, KintoneClient, Transport};
use crate::config::{BulkConfig, KinsyncConfig};
use crate::core::bulk::executor::{decode, update_entry};
use crate::core::bulk::{BatchExecutor, BulkWriter, ConcurrencyGate, Method, RetryPolicy};
use crate::core::read::{CursorReader, PageReader};
use crate::core::upsert::{Reconciler, UpsertSummary};
use crate::domain::{
    AppId, KeySelector, Query, Record, RecordId, Result, SyncError, TransportError, WriteFields,
};
use crate::{log_operation_complete, log_operation_start};
use std::future::Future;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Bulk record operations against one kintone environment
///
/// # Example
///
/// ```rust,no_run
/// use kinsync::config::load_config;
/// use kinsync::core::Repository;
/// use kinsync::domain::{AppId, Query};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("kinsync.toml")?;
/// let repository = Repository::from_config(&config)?;
///
/// let cancel = CancellationToken::new();
/// let query = Query::new(AppId::new(12)?).condition("status = \"open\"");
/// let records = repository.read_all(&cancel, &query).await?;
/// println!("{} records", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Repository {
    executor: BatchExecutor,
    writer: BulkWriter,
    pages: PageReader,
    cursor: CursorReader,
    reconciler: Reconciler,
    config: BulkConfig,
}

impl Repository {
    /// Creates a repository over `transport`
    pub fn new(transport: Arc<dyn Transport>, config: BulkConfig) -> Result<Self> {
        config.validate().map_err(SyncError::Configuration)?;

        let chunk_size = NonZeroUsize::new(config.write_chunk_size).ok_or_else(|| {
            SyncError::Configuration("write_chunk_size must be greater than 0".to_string())
        })?;
        let page_size = NonZeroU32::new(config.read_page_size).ok_or_else(|| {
            SyncError::Configuration("read_page_size must be greater than 0".to_string())
        })?;

        let executor = BatchExecutor::new(
            transport,
            ConcurrencyGate::new(config.max_concurrent),
            RetryPolicy::from_config(&config),
        );
        let writer = BulkWriter::new(executor.clone(), chunk_size);
        let cursor = CursorReader::new(executor.clone(), page_size);

        Ok(Self {
            pages: PageReader::new(executor.clone(), page_size),
            reconciler: Reconciler::new(cursor.clone(), writer.clone()),
            executor,
            writer,
            cursor,
            config,
        })
    }

    /// Creates a repository talking to kintone over HTTP
    pub fn from_config(config: &KinsyncConfig) -> Result<Self> {
        let client = KintoneClient::new(&config.kintone)?;
        Self::new(Arc::new(client), config.bulk.clone())
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Reads every matching record with concurrent offset pages
    pub async fn read_all(&self, cancel: &CancellationToken, query: &Query) -> Result<Vec<Record>> {
        traced("read_all", query.app(), None, Vec::len, self.pages.read_all(cancel, query)).await
    }

    /// Reads every matching record through a server-side cursor
    pub async fn read_all_via_cursor(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<Vec<Record>> {
        traced(
            "read_all_via_cursor",
            query.app(),
            None,
            Vec::len,
            self.cursor.read_all(cancel, query),
        )
        .await
    }

    /// Adds records and returns their new ids in input order
    pub async fn add_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        records: &[Record],
    ) -> Result<Vec<RecordId>> {
        traced(
            "add_many",
            app,
            Some(records.len()),
            Vec::len,
            self.writer.add_many(cancel, app, records),
        )
        .await
    }

    /// Updates records addressed by `key`; returns the number updated
    pub async fn update_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        records: &[Record],
    ) -> Result<usize> {
        traced(
            "update_many",
            app,
            Some(records.len()),
            |n| *n,
            self.writer.update_many(cancel, app, key, records),
        )
        .await
    }

    /// Deletes records by id; returns the number deleted
    pub async fn delete_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        ids: &[RecordId],
    ) -> Result<usize> {
        traced(
            "delete_many",
            app,
            Some(ids.len()),
            |n| *n,
            self.writer.delete_many(cancel, app, ids),
        )
        .await
    }

    /// Creates records whose key is absent and updates the others
    pub async fn upsert_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        records: &[Record],
    ) -> Result<UpsertSummary> {
        traced(
            "upsert_many",
            app,
            Some(records.len()),
            |s: &UpsertSummary| s.created.len() + s.updated,
            self.reconciler.upsert_many(cancel, app, key, records),
        )
        .await
    }

    /// Adds one record. Not retried.
    pub async fn add_record(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        record: &Record,
    ) -> Result<RecordId> {
        let request = AddRecordRequest {
            app: app.get(),
            record: WriteFields::new(&record.fields),
        };
        let body = serde_json::to_value(&request)?;
        let response = self
            .executor
            .call(cancel, Method::Post, Endpoint::Record, &body)
            .await?;
        let added: AddRecordResponse = decode(&response)?;
        tracing::debug!(app_id = app.get(), record_id = %added.id, "Record added");
        Ok(added.id)
    }

    /// Updates one record addressed by `key`. Not retried.
    pub async fn update_record(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        record: &Record,
    ) -> Result<()> {
        let request = UpdateRecordRequest {
            app: app.get(),
            entry: update_entry(record, key)?,
        };
        let body = serde_json::to_value(&request)?;
        self.executor
            .call(cancel, Method::Put, Endpoint::Record, &body)
            .await?;
        tracing::debug!(app_id = app.get(), key = %key, "Record updated");
        Ok(())
    }

    /// Adds `record` when its key is absent, otherwise updates the single
    /// record carrying it. Returns the id of the written record.
    pub async fn upsert_record(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        record: &Record,
    ) -> Result<RecordId> {
        let Some(value) = key.key_of(record) else {
            return match key {
                KeySelector::RecordId => self.add_record(cancel, app, record).await,
                KeySelector::Field(code) => Err(SyncError::Validation(format!(
                    "record has no value for key field '{code}'"
                ))),
            };
        };

        let existing = self
            .reconciler
            .lookup(cancel, app, key, std::slice::from_ref(&value), true)
            .await?;

        match existing.count(&value) {
            0 => self.add_record(cancel, app, record).await,
            1 => {
                let id = existing.single_id(&value).cloned().ok_or_else(|| {
                    TransportError::InvalidResponse(format!(
                        "lookup for {key}={value} returned no record id"
                    ))
                })?;
                self.update_record(cancel, app, key, record).await?;
                Ok(id)
            }
            n => Err(SyncError::ambiguous_key(
                key.field_code(),
                value,
                format!("matches {n} existing records"),
            )),
        }
    }
}

/// Runs one bulk operation in its own span, logging its start and end
async fn traced<T, F, Fut>(
    operation: &'static str,
    app: AppId,
    input: Option<usize>,
    count: F,
    work: Fut,
) -> Result<T>
where
    F: FnOnce(&T) -> usize,
    Fut: Future<Output = Result<T>>,
{
    let operation_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "bulk_operation",
        operation,
        app_id = app.get(),
        %operation_id
    );

    async move {
        let started = Instant::now();
        log_operation_start!(operation, input);

        let result = work.await;
        match &result {
            Ok(value) => log_operation_complete!(operation, count(value), started.elapsed()),
            Err(err) => tracing::warn!(
                operation,
                error = %err,
                duration_ms = started.elapsed().as_millis() as u64,
                "Operation failed"
            ),
        }
        result
    }
    .instrument(span)
    .await
}
