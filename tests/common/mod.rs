//! In-memory kintone used by the integration tests
//!
//! Implements [`Transport`] over a single app's records. Every call is logged,
//! the number of calls in flight is tracked, and failures can be injected.

#![allow(dead_code)]

use async_trait::async_trait;
use kinsync::adapters::kintone::{Endpoint, Transport};
use kinsync::config::{BulkConfig, RetryOn};
use kinsync::domain::{Query, RemoteApiError, Result, SyncError, TransportError};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One call as the store saw it
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub endpoint: Endpoint,
    pub body: Value,
    /// Set for `get` calls
    pub query: Option<Query>,
}

impl Call {
    /// Number of entries in the body's `records` or `ids` array
    pub fn batch_len(&self) -> usize {
        self.body
            .get("records")
            .or_else(|| self.body.get("ids"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn is(&self, method: &str, endpoint: Endpoint) -> bool {
        self.method == method && self.endpoint == endpoint
    }
}

/// Kinds of injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Timeout,
    Rejected,
}

impl Failure {
    fn to_error(self) -> SyncError {
        match self {
            Failure::Timeout => TransportError::Timeout("injected".to_string()).into(),
            Failure::Rejected => rejection(400, "CB_VA01", "injected rejection"),
        }
    }
}

#[derive(Debug, Clone)]
struct Stored {
    revision: u64,
    fields: Map<String, Value>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    records: BTreeMap<u64, Stored>,
    cursors: HashMap<String, (usize, VecDeque<Value>)>,
    next_cursor: u64,
    calls: Vec<Call>,
    write_failures: VecDeque<Failure>,
}

#[derive(Default)]
pub struct FakeKintone {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Duration>,
}

impl FakeKintone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before being answered
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    /// Adds records directly, bypassing the call log. Returns their ids.
    pub fn seed(&self, records: impl IntoIterator<Item = Value>) -> Vec<u64> {
        let mut state = self.state.lock().unwrap();
        records
            .into_iter()
            .map(|fields| insert(&mut state, plain_fields(&fields)))
            .collect()
    }

    /// The next `n` write calls fail with `failure`
    pub fn fail_writes(&self, n: usize, failure: Failure) {
        let mut state = self.state.lock().unwrap();
        state.write_failures.extend(std::iter::repeat(failure).take(n));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str, endpoint: Endpoint) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.is(method, endpoint))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// Stored value of `code` on record `id`
    pub fn value(&self, id: u64, code: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.records.get(&id)?.fields.get(code).cloned()
    }

    pub fn open_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }

    async fn handle(
        &self,
        method: &'static str,
        endpoint: Endpoint,
        body: Value,
        query: Option<Query>,
    ) -> Result<Vec<u8>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _leave = InFlight(&self.in_flight);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method,
            endpoint,
            body: body.clone(),
            query: query.clone(),
        });

        let is_write = endpoint != Endpoint::RecordsCursor && method != "GET";
        if is_write {
            if let Some(failure) = state.write_failures.pop_front() {
                return Err(failure.to_error());
            }
        }

        let response = match (method, endpoint, query) {
            ("GET", Endpoint::Records, Some(query)) => list(&state, &query)?,
            ("POST", Endpoint::Records, _) => add_many(&mut state, &body)?,
            ("PUT", Endpoint::Records, _) => update_many(&mut state, &body)?,
            ("DELETE", Endpoint::Records, _) => delete_many(&mut state, &body)?,
            ("POST", Endpoint::Record, _) => {
                let id = insert(&mut state, write_fields(&body["record"]));
                json!({"id": id.to_string(), "revision": "1"})
            }
            ("PUT", Endpoint::Record, _) => {
                let revision = update_one(&mut state, &body)?;
                json!({"revision": revision.to_string()})
            }
            ("POST", Endpoint::RecordsCursor, _) => open_cursor(&mut state, &body)?,
            ("GET", Endpoint::RecordsCursor, _) => next_page(&mut state, &body)?,
            ("DELETE", Endpoint::RecordsCursor, _) => {
                let id = body["id"].as_str().unwrap_or_default();
                state.cursors.remove(id);
                json!({})
            }
            _ => {
                return Err(TransportError::InvalidRequest(format!(
                    "unsupported call {method} {endpoint}"
                ))
                .into())
            }
        };

        Ok(serde_json::to_vec(&response).unwrap())
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeKintone {
    async fn get(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<u8>> {
        self.handle("GET", endpoint, query.to_body(), Some(query.clone()))
            .await
    }

    async fn get_with_body(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.handle("GET", endpoint, body.clone(), None).await
    }

    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.handle("POST", endpoint, body.clone(), None).await
    }

    async fn put(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.handle("PUT", endpoint, body.clone(), None).await
    }

    async fn delete(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.handle("DELETE", endpoint, body.clone(), None).await
    }
}

/// Bulk settings for tests: no retry delay
pub fn bulk_config(max_concurrent: usize, max_retries: u32) -> BulkConfig {
    BulkConfig {
        max_concurrent,
        max_retries,
        retry_interval_ms: 1,
        retry_on: RetryOn::AnyError,
        ..BulkConfig::default()
    }
}

pub fn rejection(status: u16, code: &str, message: &str) -> SyncError {
    RemoteApiError {
        status,
        code: code.to_string(),
        id: "fake".to_string(),
        message: message.to_string(),
        errors: None,
    }
    .into()
}

fn insert(state: &mut State, fields: Map<String, Value>) -> u64 {
    state.next_id += 1;
    let id = state.next_id;
    state.records.insert(
        id,
        Stored {
            revision: 1,
            fields,
        },
    );
    id
}

/// `{"code": "v"}` as given to `seed`
fn plain_fields(fields: &Value) -> Map<String, Value> {
    fields.as_object().cloned().unwrap_or_default()
}

/// `{"code": {"value": "v"}}` as sent by the client
fn write_fields(record: &Value) -> Map<String, Value> {
    record
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .map(|(code, field)| (code.clone(), field["value"].clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Typed JSON for one stored record, limited to `fields` when not empty
fn typed(id: u64, stored: &Stored, fields: &[String]) -> Value {
    let wanted = |code: &str| fields.is_empty() || fields.iter().any(|f| f == code);

    let mut out = Map::new();
    if wanted("$id") {
        out.insert(
            "$id".to_string(),
            json!({"type": "__ID__", "value": id.to_string()}),
        );
    }
    if fields.is_empty() {
        out.insert(
            "$revision".to_string(),
            json!({"type": "__REVISION__", "value": stored.revision.to_string()}),
        );
    }
    for (code, value) in &stored.fields {
        if !wanted(code) {
            continue;
        }
        let field = match value {
            Value::Array(_) => json!({"type": "CHECK_BOX", "value": value}),
            Value::String(_) => json!({"type": "SINGLE_LINE_TEXT", "value": value}),
            other => json!({"type": "SINGLE_LINE_TEXT", "value": other.to_string()}),
        };
        out.insert(code.clone(), field);
    }
    Value::Object(out)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses `f = "a" or f = "b"`, the only condition shape the tests send
fn parse_condition(condition: &str) -> Result<Vec<(String, String)>> {
    let invalid = || rejection(400, "GAIA_IQ11", "invalid query");
    let mut clauses = Vec::new();
    let mut rest = condition.trim();

    while !rest.is_empty() {
        let (field, after) = rest.split_once(" = \"").ok_or_else(invalid)?;
        let mut value = String::new();
        let mut chars = after.char_indices();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                '"' => {
                    end = Some(i + 1);
                    break;
                }
                c => value.push(c),
            }
        }
        let end = end.ok_or_else(invalid)?;
        clauses.push((field.trim().to_string(), value));

        rest = after[end..].trim_start();
        if let Some(next) = rest.strip_prefix("or ") {
            rest = next.trim_start();
        } else if !rest.is_empty() {
            return Err(invalid());
        }
    }
    Ok(clauses)
}

fn matches(id: u64, stored: &Stored, clauses: &[(String, String)]) -> bool {
    clauses.is_empty()
        || clauses.iter().any(|(field, value)| {
            if field == "$id" {
                id.to_string() == *value
            } else {
                stored.fields.get(field).map(text_of).as_deref() == Some(value.as_str())
            }
        })
}

fn matching<'a>(state: &'a State, condition: &str) -> Result<Vec<(u64, &'a Stored)>> {
    let condition = condition.split(" order by ").next().unwrap_or_default();
    let clauses = parse_condition(condition)?;
    Ok(state
        .records
        .iter()
        .filter(|(id, stored)| matches(**id, stored, &clauses))
        .map(|(id, stored)| (*id, stored))
        .collect())
}

fn list(state: &State, query: &Query) -> Result<Value> {
    let found = matching(state, query.condition_text())?;
    let total = found.len();
    let offset = query.offset().unwrap_or(0) as usize;
    let limit = query.limit().unwrap_or(100) as usize;

    if offset > 10_000 {
        return Err(rejection(400, "GAIA_QU01", "offset too large"));
    }

    let records: Vec<Value> = found
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(id, stored)| typed(id, stored, query.field_list()))
        .collect();

    Ok(json!({
        "records": records,
        "totalCount": query.total_count().then(|| total.to_string()),
    }))
}

fn add_many(state: &mut State, body: &Value) -> Result<Value> {
    let records = body["records"].as_array().cloned().unwrap_or_default();
    if records.len() > 100 {
        return Err(rejection(400, "CB_VA01", "too many records"));
    }
    let ids: Vec<String> = records
        .iter()
        .map(|record| insert(state, write_fields(record)).to_string())
        .collect();
    let revisions = vec!["1"; ids.len()];
    Ok(json!({"ids": ids, "revisions": revisions}))
}

/// Finds the record addressed by `id` or `updateKey`
fn target(state: &State, entry: &Value) -> Result<u64> {
    if let Some(id) = entry.get("id").and_then(Value::as_str) {
        let id: u64 = id
            .parse()
            .map_err(|_| rejection(400, "CB_VA01", "bad id"))?;
        return if state.records.contains_key(&id) {
            Ok(id)
        } else {
            Err(rejection(404, "GAIA_RE01", "record not found"))
        };
    }

    let key = &entry["updateKey"];
    let field = key["field"].as_str().unwrap_or_default();
    let value = key["value"].as_str().unwrap_or_default();
    let found: Vec<u64> = state
        .records
        .iter()
        .filter(|(_, stored)| stored.fields.get(field).map(text_of).as_deref() == Some(value))
        .map(|(id, _)| *id)
        .collect();
    match found.as_slice() {
        [id] => Ok(*id),
        [] => Err(rejection(404, "GAIA_RE01", "record not found")),
        _ => Err(rejection(400, "GAIA_DA02", "key is not unique")),
    }
}

fn update_one(state: &mut State, entry: &Value) -> Result<u64> {
    let id = target(state, entry)?;
    let fields = write_fields(&entry["record"]);
    let stored = state
        .records
        .get_mut(&id)
        .ok_or_else(|| rejection(404, "GAIA_RE01", "record not found"))?;
    stored.fields.extend(fields);
    stored.revision += 1;
    Ok(stored.revision)
}

fn update_many(state: &mut State, body: &Value) -> Result<Value> {
    let entries = body["records"].as_array().cloned().unwrap_or_default();
    if entries.len() > 100 {
        return Err(rejection(400, "CB_VA01", "too many records"));
    }
    // All or nothing, like the real store
    for entry in &entries {
        target(state, entry)?;
    }
    let mut results = Vec::with_capacity(entries.len());
    for entry in &entries {
        let id = target(state, entry)?;
        let revision = update_one(state, entry)?;
        results.push(json!({"id": id.to_string(), "revision": revision.to_string()}));
    }
    Ok(json!({"records": results}))
}

fn delete_many(state: &mut State, body: &Value) -> Result<Value> {
    let ids: Vec<u64> = body["ids"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|id| id.as_str().and_then(|s| s.parse().ok()))
        .collect();
    if ids.len() > 100 {
        return Err(rejection(400, "CB_VA01", "too many ids"));
    }
    if ids.iter().any(|id| !state.records.contains_key(id)) {
        return Err(rejection(404, "GAIA_RE01", "record not found"));
    }
    for id in ids {
        state.records.remove(&id);
    }
    Ok(json!({}))
}

fn open_cursor(state: &mut State, body: &Value) -> Result<Value> {
    let fields: Vec<String> = body["fields"]
        .as_array()
        .map(|f| f.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let size = body["size"].as_u64().unwrap_or(100) as usize;
    let query = body["query"].as_str().unwrap_or_default();

    let records: VecDeque<Value> = matching(state, query)?
        .into_iter()
        .map(|(id, stored)| typed(id, stored, &fields))
        .collect();
    let total = records.len();

    state.next_cursor += 1;
    let id = format!("cursor-{}", state.next_cursor);
    state.cursors.insert(id.clone(), (size, records));
    Ok(json!({"id": id, "totalCount": total.to_string()}))
}

fn next_page(state: &mut State, body: &Value) -> Result<Value> {
    let id = body["id"].as_str().unwrap_or_default().to_string();
    let (size, remaining) = state
        .cursors
        .get_mut(&id)
        .ok_or_else(|| rejection(400, "GAIA_CR02", "cursor not found"))?;

    let take = (*size).min(remaining.len());
    let page: Vec<Value> = remaining.drain(..take).collect();
    let next = !remaining.is_empty();
    if !next {
        state.cursors.remove(&id);
    }
    Ok(json!({"records": page, "next": next}))
}
