//! Record model
//!
//! A [`Record`] is what callers hand to the bulk operations and what reads
//! return: an optional id and revision (absent until the store assigns them)
//! plus the typed field map.

use super::field::{FieldValue, Fields, RawField};
use super::ids::RecordId;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

const ID_TYPE: &str = "__ID__";
const REVISION_TYPE: &str = "__REVISION__";

/// A record of a kintone app
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Id assigned by the store, if any
    pub id: Option<RecordId>,

    /// Revision at read time, if known
    pub revision: Option<String>,

    /// Field values keyed by field code
    pub fields: Fields,
}

impl Record {
    /// Creates an empty record with no id
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record that refers to an existing id
    pub fn with_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Builder-style field setter
    pub fn field(mut self, code: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(code, value);
        self
    }

    /// Looks up a field value
    pub fn get(&self, code: &str) -> Option<&FieldValue> {
        self.fields.get(code)
    }

    /// Sets a field value, returning the previous one
    pub fn set(&mut self, code: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(code, value)
    }

    fn from_raw(raw: BTreeMap<String, RawField>) -> Result<Self, serde_json::Error> {
        let mut id = None;
        let mut revision = None;
        let mut rest = BTreeMap::new();

        for (code, field) in raw {
            match field.kind.as_str() {
                ID_TYPE => id = scalar_text(&field.value),
                REVISION_TYPE => revision = scalar_text(&field.value),
                _ => {
                    rest.insert(code, field);
                }
            }
        }

        let fields = Fields::from_raw(rest)?;

        // Apps without a $id projection still carry the record number
        if id.is_none() {
            id = fields.iter().find_map(|(_, value)| match value {
                FieldValue::RecordNumber(number) => record_number_id(number),
                _ => None,
            });
        }

        Ok(Self {
            id: id.and_then(|s| RecordId::new(s).ok()),
            revision,
            fields,
        })
    }
}

/// Takes the numeric suffix of a record number (`APP-12` -> `12`)
fn record_number_id(number: &str) -> Option<String> {
    let tail = number.rsplit('-').next().unwrap_or(number);
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
        Some(tail.to_string())
    } else {
        None
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry(
                "$id",
                &serde_json::json!({ "type": ID_TYPE, "value": id.as_str() }),
            )?;
        }
        if let Some(revision) = &self.revision {
            map.serialize_entry(
                "$revision",
                &serde_json::json!({ "type": REVISION_TYPE, "value": revision }),
            )?;
        }
        for (code, value) in self.fields.iter() {
            map.serialize_entry(code, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RawField>::deserialize(deserializer)?;
        Record::from_raw(raw).map_err(D::Error::custom)
    }
}
