//! Wire models for the kintone record endpoints
//!
//! Request types borrow from the caller's records so encoding a chunk never
//! clones field maps. Response types decode only what the bulk engine reads.

use crate::domain::{Record, RecordId, WriteFields};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `{"field": code, "value": key}` selector for update-by-key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateKey {
    pub field: String,
    pub value: String,
}

/// POST `/records.json`
#[derive(Serialize)]
pub struct AddRecordsRequest<'a> {
    pub app: u64,
    pub records: Vec<WriteFields<'a>>,
}

/// POST `/record.json`
#[derive(Serialize)]
pub struct AddRecordRequest<'a> {
    pub app: u64,
    pub record: WriteFields<'a>,
}

/// One entry of a PUT `/records.json`, also the body of PUT `/record.json`
#[derive(Serialize)]
pub struct UpdateEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,

    #[serde(rename = "updateKey", skip_serializing_if = "Option::is_none")]
    pub update_key: Option<UpdateKey>,

    pub record: WriteFields<'a>,
}

/// PUT `/records.json`
#[derive(Serialize)]
pub struct UpdateRecordsRequest<'a> {
    pub app: u64,
    pub records: Vec<UpdateEntry<'a>>,
}

/// PUT `/record.json`
#[derive(Serialize)]
pub struct UpdateRecordRequest<'a> {
    pub app: u64,
    #[serde(flatten)]
    pub entry: UpdateEntry<'a>,
}

/// DELETE `/records.json`
#[derive(Serialize)]
pub struct DeleteRecordsRequest<'a> {
    pub app: u64,
    pub ids: Vec<&'a str>,
}

/// POST `/records/cursor.json`
#[derive(Serialize)]
pub struct CreateCursorRequest<'a> {
    pub app: u64,
    #[serde(skip_serializing_if = "no_fields")]
    pub fields: &'a [String],
    pub query: String,
    pub size: u32,
}

fn no_fields(fields: &&[String]) -> bool {
    fields.is_empty()
}

/// GET/DELETE `/records/cursor.json`
#[derive(Serialize)]
pub struct CursorIdRequest<'a> {
    pub id: &'a str,
}

/// GET `/records.json`
#[derive(Debug, Deserialize)]
pub struct RecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,

    #[serde(rename = "totalCount", default, deserialize_with = "count_text")]
    pub total_count: Option<u64>,
}

/// POST `/records.json`
#[derive(Debug, Deserialize)]
pub struct AddRecordsResponse {
    pub ids: Vec<RecordId>,

    #[serde(default)]
    pub revisions: Vec<String>,
}

/// POST `/record.json`
#[derive(Debug, Deserialize)]
pub struct AddRecordResponse {
    pub id: RecordId,

    #[serde(default)]
    pub revision: String,
}

/// POST `/records/cursor.json`
#[derive(Debug, Deserialize)]
pub struct CreateCursorResponse {
    pub id: String,

    #[serde(rename = "totalCount", default, deserialize_with = "count_text")]
    pub total_count: Option<u64>,
}

/// GET `/records/cursor.json`
#[derive(Debug, Deserialize)]
pub struct CursorPageResponse {
    #[serde(default)]
    pub records: Vec<Record>,

    #[serde(default)]
    pub next: bool,
}

/// Counts arrive as strings (`"1200"`), occasionally as numbers or null
fn count_text<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_u64()),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid count '{s}': {e}"))),
        Some(other) => Err(D::Error::custom(format!("invalid count: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldValue, Fields};
    use serde_json::json;

    #[test]
    fn test_records_response_total_count() {
        let body = json!({"records": [], "totalCount": "1200"});
        let response: RecordsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.total_count, Some(1200));

        let body = json!({"records": [], "totalCount": null});
        let response: RecordsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.total_count, None);
    }

    #[test]
    fn test_update_entry_by_key_omits_id() {
        let fields: Fields = [
            ("code".to_string(), FieldValue::text("A-1")),
            ("title".to_string(), FieldValue::text("t")),
        ]
        .into_iter()
        .collect();

        let entry = UpdateEntry {
            id: None,
            update_key: Some(UpdateKey {
                field: "code".to_string(),
                value: "A-1".to_string(),
            }),
            record: WriteFields::without(&fields, "code"),
        };

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "updateKey": {"field": "code", "value": "A-1"},
                "record": {"title": {"value": "t"}}
            })
        );
    }

    #[test]
    fn test_single_update_flattens_entry() {
        let fields = Fields::new();
        let request = UpdateRecordRequest {
            app: 3,
            entry: UpdateEntry {
                id: Some("9"),
                update_key: None,
                record: WriteFields::new(&fields),
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"app": 3, "id": "9", "record": {}})
        );
    }

    #[test]
    fn test_cursor_request_omits_empty_fields() {
        let request = CreateCursorRequest {
            app: 1,
            fields: &[],
            query: String::new(),
            size: 500,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"app": 1, "query": "", "size": 500})
        );
    }
}
