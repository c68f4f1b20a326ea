//! Chunked, concurrent writes
//!
//! Each `*_many` call splits its input into chunks and runs one executor call
//! per chunk. The calls share a child of the caller's cancellation token; the
//! first failure ends the operation, dropping the chunks still in flight and
//! cancelling anything waiting on the gate or a retry delay.

use super::chunk::chunks;
use super::executor::{BatchExecutor, BatchOperation, BatchOutcome};
use crate::domain::{AppId, KeySelector, Record, RecordId, Result, SyncError};
use crate::log_chunk_result;
use futures::future::try_join_all;
use std::num::NonZeroUsize;
use tokio_util::sync::CancellationToken;

/// Bulk add, update and delete for one repository
#[derive(Clone)]
pub struct BulkWriter {
    executor: BatchExecutor,
    chunk_size: NonZeroUsize,
}

impl BulkWriter {
    pub fn new(executor: BatchExecutor, chunk_size: NonZeroUsize) -> Self {
        Self {
            executor,
            chunk_size,
        }
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    /// Adds every record and returns the new ids in input order
    pub async fn add_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        records: &[Record],
    ) -> Result<Vec<RecordId>> {
        let refs: Vec<&Record> = records.iter().collect();
        self.add_refs(cancel, app, &refs).await
    }

    pub(crate) async fn add_refs(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        records: &[&Record],
    ) -> Result<Vec<RecordId>> {
        let outcomes = self
            .run_chunks(cancel, app, records, BatchOperation::Add)
            .await?;

        let mut ids = Vec::with_capacity(records.len());
        for outcome in outcomes {
            if let BatchOutcome::Added(chunk_ids) = outcome {
                ids.extend(chunk_ids);
            }
        }
        Ok(ids)
    }

    /// Updates every record, addressed by `key`. Returns the number updated.
    ///
    /// Every record is checked for a key before the first call is made.
    pub async fn update_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        records: &[Record],
    ) -> Result<usize> {
        let refs: Vec<&Record> = records.iter().collect();
        self.update_refs(cancel, app, key, &refs).await
    }

    pub(crate) async fn update_refs(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        records: &[&Record],
    ) -> Result<usize> {
        if let Some(position) = records.iter().position(|r| key.key_of(r).is_none()) {
            return Err(SyncError::Validation(format!(
                "record {position} has no value for update key '{key}'"
            )));
        }

        let outcomes = self
            .run_chunks(cancel, app, records, |chunk| BatchOperation::Update {
                records: chunk,
                key,
            })
            .await?;

        Ok(outcomes.iter().map(outcome_count).sum())
    }

    /// Deletes the records with these ids. Returns the number deleted.
    pub async fn delete_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        ids: &[RecordId],
    ) -> Result<usize> {
        let outcomes = self
            .run_chunks(cancel, app, ids, BatchOperation::Delete)
            .await?;
        Ok(outcomes.iter().map(outcome_count).sum())
    }

    /// Runs one executor call per chunk; results come back in chunk order.
    async fn run_chunks<'a, T, F>(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        items: &'a [T],
        make: F,
    ) -> Result<Vec<BatchOutcome>>
    where
        F: Fn(&'a [T]) -> BatchOperation<'a>,
    {
        let parts = chunks(items, self.chunk_size);
        let total = parts.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let scope = cancel.child_token();
        let _cancel_on_exit = scope.clone().drop_guard();
        let scope = &scope;

        let calls = parts.into_iter().enumerate().map(|(index, chunk)| {
            let op = make(chunk);
            async move {
                let result = self.executor.execute(scope, app, op).await;
                log_chunk_result!(op.label(), index + 1, total, op.len(), &result);
                result
            }
        });

        try_join_all(calls).await
    }
}

fn outcome_count(outcome: &BatchOutcome) -> usize {
    match outcome {
        BatchOutcome::Added(ids) => ids.len(),
        BatchOutcome::Updated(n) | BatchOutcome::Deleted(n) => *n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bulk::gate::ConcurrencyGate;
    use crate::core::bulk::retry::RetryPolicy;
    use crate::core::bulk::testing::ScriptedTransport;
    use crate::core::bulk::Method;
    use crate::domain::FieldValue;
    use serde_json::json;
    use std::sync::Arc;

    fn writer(transport: Arc<ScriptedTransport>, chunk_size: usize) -> BulkWriter {
        BulkWriter::new(
            BatchExecutor::new(transport, ConcurrencyGate::new(2), RetryPolicy::none()),
            NonZeroUsize::new(chunk_size).unwrap(),
        )
    }

    fn app() -> AppId {
        AppId::new(1).unwrap()
    }

    fn named(n: usize) -> Record {
        Record::new().field("n", FieldValue::number(n as f64))
    }

    #[tokio::test]
    async fn test_empty_inputs_make_no_calls() {
        let transport = ScriptedTransport::new(0, json!({}));
        let writer = writer(transport.clone(), 100);
        let cancel = CancellationToken::new();

        assert!(writer.add_many(&cancel, app(), &[]).await.unwrap().is_empty());
        assert_eq!(
            writer
                .update_many(&cancel, app(), &KeySelector::RecordId, &[])
                .await
                .unwrap(),
            0
        );
        assert_eq!(writer.delete_many(&cancel, app(), &[]).await.unwrap(), 0);
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_ids_follow_chunk_order() {
        let transport = ScriptedTransport::queued(
            0,
            vec![
                json!({"ids": ["10", "11"]}),
                json!({"ids": ["12", "13"]}),
                json!({"ids": ["14"]}),
            ],
            json!({}),
        );
        let records: Vec<Record> = (0..5).map(named).collect();

        let ids = writer(transport.clone(), 2)
            .add_many(&CancellationToken::new(), app(), &records)
            .await
            .unwrap();

        let ids: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
        assert_eq!(ids, vec!["10", "11", "12", "13", "14"]);
        assert_eq!(transport.methods(), vec![Method::Post; 3]);
    }

    #[tokio::test]
    async fn test_delete_counts_every_chunk() {
        let transport = ScriptedTransport::new(0, json!({}));
        let ids: Vec<RecordId> = (1..=7u64).map(RecordId::from).collect();

        let deleted = writer(transport.clone(), 3)
            .delete_many(&CancellationToken::new(), app(), &ids)
            .await
            .unwrap();

        assert_eq!(deleted, 7);
        let calls = transport.calls.lock().unwrap();
        let sizes: Vec<usize> = calls
            .iter()
            .map(|(_, body)| body["ids"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes.iter().sum::<usize>(), 7);
        assert_eq!(sizes.len(), 3);
    }

    #[tokio::test]
    async fn test_first_failure_is_returned() {
        let transport = ScriptedTransport::new(1, json!({}));
        let ids: Vec<RecordId> = (1..=4u64).map(RecordId::from).collect();

        let result = writer(transport, 2)
            .delete_many(&CancellationToken::new(), app(), &ids)
            .await;

        assert!(result.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_update_without_key_fails_before_any_call() {
        let transport = ScriptedTransport::new(0, json!({}));
        let records = vec![Record::with_id(RecordId::from(1u64)), Record::new()];

        let err = writer(transport.clone(), 100)
            .update_many(&CancellationToken::new(), app(), &KeySelector::RecordId, &records)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        assert!(err.to_string().contains("record 1"));
        assert!(transport.calls.lock().unwrap().is_empty());
    }
}
