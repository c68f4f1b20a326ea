//! Create-or-update by key
//!
//! Candidate keys are looked up remotely, the candidates are split into
//! records to create and records to update, and both halves are written
//! concurrently. Any ambiguity is reported before the first write.

use super::key::ExistingKeySet;
use crate::core::bulk::BulkWriter;
use crate::core::read::CursorReader;
use crate::domain::{AppId, Condition, KeySelector, Query, Record, RecordId, Result, SyncError};
use futures::future::try_join_all;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Key values per lookup query, keeping the condition within URL limits
pub const LOOKUP_CHUNK: usize = 100;

/// Outcome of an upsert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Ids of created records, in input order
    pub created: Vec<RecordId>,
    /// Number of updated records
    pub updated: usize,
}

/// Candidates split by whether their key already exists
#[derive(Debug, Default)]
pub struct UpsertPlan<'a> {
    pub create: Vec<&'a Record>,
    pub update: Vec<&'a Record>,
}

/// Splits `records` against the remote keys.
///
/// Fails with `AmbiguousKey` when a key repeats among the candidates or
/// matches more than one remote record, and with `Validation` when a record
/// has no value for a field key. Records without an id go to `create` when
/// keyed by record id.
pub fn plan<'a>(
    key: &KeySelector,
    records: &'a [Record],
    existing: &ExistingKeySet,
) -> Result<UpsertPlan<'a>> {
    let mut plan = UpsertPlan::default();
    for (record, value) in records.iter().zip(candidate_keys(key, records)?) {
        let Some(value) = value else {
            plan.create.push(record);
            continue;
        };
        match existing.count(&value) {
            0 => plan.create.push(record),
            1 => plan.update.push(record),
            n => {
                return Err(SyncError::ambiguous_key(
                    key.field_code(),
                    value,
                    format!("matches {n} existing records"),
                ))
            }
        }
    }
    Ok(plan)
}

/// Key value of every candidate, checked for duplicates
fn candidate_keys(key: &KeySelector, records: &[Record]) -> Result<Vec<Option<String>>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let value = key.key_of(record);
        match (&value, key) {
            (None, KeySelector::Field(code)) => {
                return Err(SyncError::Validation(format!(
                    "record {position} has no value for key field '{code}'"
                )))
            }
            (Some(v), _) if !seen.insert(v.clone()) => {
                return Err(SyncError::ambiguous_key(
                    key.field_code(),
                    v.clone(),
                    "appears more than once in the input",
                ))
            }
            _ => {}
        }
        keys.push(value);
    }
    Ok(keys)
}

/// Runs upserts for one repository
#[derive(Clone)]
pub struct Reconciler {
    reader: CursorReader,
    writer: BulkWriter,
}

impl Reconciler {
    pub fn new(reader: CursorReader, writer: BulkWriter) -> Self {
        Self { reader, writer }
    }

    /// Creates the records whose key is absent and updates the rest
    pub async fn upsert_many(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        records: &[Record],
    ) -> Result<UpsertSummary> {
        let keys: Vec<String> = candidate_keys(key, records)?.into_iter().flatten().collect();
        let existing = self.lookup(cancel, app, key, &keys, false).await?;
        let plan = plan(key, records, &existing)?;

        tracing::debug!(
            app_id = app.get(),
            key = %key,
            create = plan.create.len(),
            update = plan.update.len(),
            "Upsert planned"
        );

        let scope = cancel.child_token();
        let _cancel_on_exit = scope.clone().drop_guard();

        let (created, updated) = tokio::try_join!(
            self.writer.add_refs(&scope, app, &plan.create),
            self.writer.update_refs(&scope, app, key, &plan.update),
        )?;

        Ok(UpsertSummary { created, updated })
    }

    /// Reads the remote records carrying any of `keys`, projecting only the
    /// key field (and the record id when `with_ids` is set).
    pub async fn lookup(
        &self,
        cancel: &CancellationToken,
        app: AppId,
        key: &KeySelector,
        keys: &[String],
        with_ids: bool,
    ) -> Result<ExistingKeySet> {
        if keys.is_empty() {
            return Ok(ExistingKeySet::default());
        }

        let mut fields = vec![key.field_code().to_string()];
        if with_ids && *key != KeySelector::RecordId {
            fields.push(KeySelector::ID_FIELD.to_string());
        }

        let queries: Vec<Query> = keys
            .chunks(LOOKUP_CHUNK)
            .map(|chunk| {
                Query::new(app)
                    .condition(Condition::any_equal(key.field_code(), chunk))
                    .fields(fields.iter().cloned())
            })
            .collect();

        let scope = cancel.child_token();
        let _cancel_on_exit = scope.clone().drop_guard();
        let pages = try_join_all(queries.iter().map(|q| self.reader.read_all(&scope, q))).await?;

        Ok(ExistingKeySet::from_records(key, pages.iter().flatten()))
    }
}
