//! Typed field values
//!
//! kintone transports every field as `{"type": "<KIND>", "value": <json>}`. The
//! kind tag selects how the value is shaped, so [`FieldValue`] is an adjacently
//! tagged enum: serde picks the variant from `type` and decodes `value` with the
//! variant's own rules. Writes send only the `value` half, see
//! [`FieldValue::write_value`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A user, organization or group reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Login name or organization/group code
    pub code: String,

    /// Display name (not required on writes)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Entity {
    /// Creates an entity reference from its code
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: String::new(),
        }
    }
}

/// An attachment in a FILE field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "contentType", default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,

    #[serde(rename = "fileKey")]
    pub file_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, with = "size_text", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One row of a SUBTABLE field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtableRow {
    /// Row id; empty for rows that have not been stored yet
    #[serde(default)]
    pub id: String,

    /// Fields of the row
    pub value: Fields,
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    #[serde(rename = "SINGLE_LINE_TEXT")]
    SingleLineText(String),

    #[serde(rename = "MULTI_LINE_TEXT")]
    MultiLineText(String),

    #[serde(rename = "RICH_TEXT")]
    RichText(String),

    #[serde(rename = "LINK")]
    Link(String),

    #[serde(rename = "RADIO_BUTTON")]
    RadioButton(#[serde(deserialize_with = "empty_as_none")] Option<String>),

    #[serde(rename = "DROP_DOWN")]
    DropDown(#[serde(deserialize_with = "empty_as_none")] Option<String>),

    #[serde(rename = "STATUS")]
    Status(String),

    #[serde(rename = "RECORD_NUMBER")]
    RecordNumber(String),

    #[serde(rename = "CALC")]
    Calc(String),

    /// Decimal text exactly as the store sent it; an empty string means
    /// "no value". Kept as text since values may exceed `f64` precision.
    #[serde(rename = "NUMBER")]
    Number(#[serde(with = "number_text")] Option<String>),

    #[serde(rename = "CHECK_BOX")]
    CheckBox(Vec<String>),

    #[serde(rename = "MULTI_SELECT")]
    MultiSelect(Vec<String>),

    #[serde(rename = "CATEGORY")]
    Category(Vec<String>),

    #[serde(rename = "FILE")]
    File(Vec<FileInfo>),

    #[serde(rename = "DATE")]
    Date(#[serde(with = "date_text")] Option<NaiveDate>),

    #[serde(rename = "TIME")]
    Time(#[serde(with = "time_text")] Option<NaiveTime>),

    #[serde(rename = "DATETIME")]
    DateTime(#[serde(with = "datetime_text")] Option<DateTime<Utc>>),

    #[serde(rename = "CREATED_TIME")]
    CreatedTime(#[serde(with = "datetime_text")] Option<DateTime<Utc>>),

    #[serde(rename = "UPDATED_TIME")]
    UpdatedTime(#[serde(with = "datetime_text")] Option<DateTime<Utc>>),

    #[serde(rename = "USER_SELECT")]
    UserSelect(Vec<Entity>),

    #[serde(rename = "STATUS_ASSIGNEE")]
    StatusAssignee(Vec<Entity>),

    #[serde(rename = "ORGANIZATION_SELECT")]
    OrganizationSelect(Vec<Entity>),

    #[serde(rename = "GROUP_SELECT")]
    GroupSelect(Vec<Entity>),

    #[serde(rename = "CREATOR")]
    Creator(Entity),

    #[serde(rename = "MODIFIER")]
    Modifier(Entity),

    #[serde(rename = "SUBTABLE")]
    Subtable(Vec<SubtableRow>),
}

/// Type tags this codec understands
const KNOWN_TYPES: &[&str] = &[
    "SINGLE_LINE_TEXT",
    "MULTI_LINE_TEXT",
    "RICH_TEXT",
    "LINK",
    "RADIO_BUTTON",
    "DROP_DOWN",
    "STATUS",
    "RECORD_NUMBER",
    "CALC",
    "NUMBER",
    "CHECK_BOX",
    "MULTI_SELECT",
    "CATEGORY",
    "FILE",
    "DATE",
    "TIME",
    "DATETIME",
    "CREATED_TIME",
    "UPDATED_TIME",
    "USER_SELECT",
    "STATUS_ASSIGNEE",
    "ORGANIZATION_SELECT",
    "GROUP_SELECT",
    "CREATOR",
    "MODIFIER",
    "SUBTABLE",
];

impl FieldValue {
    /// Single line text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::SingleLineText(value.into())
    }

    /// Number value
    pub fn number(value: f64) -> Self {
        FieldValue::Number(Some(number_text::format(value)))
    }

    /// Number value from decimal text, kept digit for digit
    pub fn decimal(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if number_text::is_decimal(text) {
            Ok(FieldValue::Number(Some(text.to_string())))
        } else {
            Err(format!("invalid number '{text}'"))
        }
    }

    /// Numeric value of a NUMBER field, possibly rounded
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(Some(text)) => text.parse().ok(),
            _ => None,
        }
    }

    /// Returns true if `kind` is a type tag this codec can decode
    pub fn is_known_type(kind: &str) -> bool {
        KNOWN_TYPES.contains(&kind)
    }

    /// Decodes a field from its type tag and raw value.
    ///
    /// Returns `Ok(None)` for tags the codec doesn't know about.
    pub fn from_typed(kind: &str, value: Value) -> Result<Option<Self>, serde_json::Error> {
        if !Self::is_known_type(kind) {
            return Ok(None);
        }
        let tagged = serde_json::json!({ "type": kind, "value": value });
        serde_json::from_value(tagged).map(Some)
    }

    /// The wire type tag of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::SingleLineText(_) => "SINGLE_LINE_TEXT",
            FieldValue::MultiLineText(_) => "MULTI_LINE_TEXT",
            FieldValue::RichText(_) => "RICH_TEXT",
            FieldValue::Link(_) => "LINK",
            FieldValue::RadioButton(_) => "RADIO_BUTTON",
            FieldValue::DropDown(_) => "DROP_DOWN",
            FieldValue::Status(_) => "STATUS",
            FieldValue::RecordNumber(_) => "RECORD_NUMBER",
            FieldValue::Calc(_) => "CALC",
            FieldValue::Number(_) => "NUMBER",
            FieldValue::CheckBox(_) => "CHECK_BOX",
            FieldValue::MultiSelect(_) => "MULTI_SELECT",
            FieldValue::Category(_) => "CATEGORY",
            FieldValue::File(_) => "FILE",
            FieldValue::Date(_) => "DATE",
            FieldValue::Time(_) => "TIME",
            FieldValue::DateTime(_) => "DATETIME",
            FieldValue::CreatedTime(_) => "CREATED_TIME",
            FieldValue::UpdatedTime(_) => "UPDATED_TIME",
            FieldValue::UserSelect(_) => "USER_SELECT",
            FieldValue::StatusAssignee(_) => "STATUS_ASSIGNEE",
            FieldValue::OrganizationSelect(_) => "ORGANIZATION_SELECT",
            FieldValue::GroupSelect(_) => "GROUP_SELECT",
            FieldValue::Creator(_) => "CREATOR",
            FieldValue::Modifier(_) => "MODIFIER",
            FieldValue::Subtable(_) => "SUBTABLE",
        }
    }

    /// Whether the value may be sent in an add or update request.
    ///
    /// System-maintained kinds are rejected or ignored by the API on writes.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            FieldValue::RecordNumber(_)
                | FieldValue::Calc(_)
                | FieldValue::Status(_)
                | FieldValue::StatusAssignee(_)
                | FieldValue::Category(_)
                | FieldValue::Creator(_)
                | FieldValue::Modifier(_)
                | FieldValue::CreatedTime(_)
                | FieldValue::UpdatedTime(_)
        )
    }

    /// The `value` half of the wire form, as sent in write requests
    pub fn write_value(&self) -> Result<Value, serde_json::Error> {
        if let FieldValue::Subtable(rows) = self {
            let rows = rows
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    if !row.id.is_empty() {
                        obj.insert("id".to_string(), Value::String(row.id.clone()));
                    }
                    obj.insert("value".to_string(), row.value.to_write_json(None)?);
                    Ok(Value::Object(obj))
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            return Ok(Value::Array(rows));
        }

        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

/// String form used for upsert keys and query conditions
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::SingleLineText(s)
            | FieldValue::MultiLineText(s)
            | FieldValue::RichText(s)
            | FieldValue::Link(s)
            | FieldValue::Status(s)
            | FieldValue::RecordNumber(s)
            | FieldValue::Calc(s) => f.write_str(s),
            FieldValue::RadioButton(v) | FieldValue::DropDown(v) => {
                f.write_str(v.as_deref().unwrap_or_default())
            }
            FieldValue::Number(Some(n)) => f.write_str(n),
            FieldValue::Number(None) => Ok(()),
            FieldValue::CheckBox(items)
            | FieldValue::MultiSelect(items)
            | FieldValue::Category(items) => f.write_str(&items.join(",")),
            FieldValue::File(files) => {
                let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
                f.write_str(&names.join(","))
            }
            FieldValue::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Time(Some(t)) => write!(f, "{}", t.format("%H:%M")),
            FieldValue::DateTime(Some(t))
            | FieldValue::CreatedTime(Some(t))
            | FieldValue::UpdatedTime(Some(t)) => f.write_str(&datetime_text::format(t)),
            FieldValue::Date(None)
            | FieldValue::Time(None)
            | FieldValue::DateTime(None)
            | FieldValue::CreatedTime(None)
            | FieldValue::UpdatedTime(None) => Ok(()),
            FieldValue::UserSelect(entities)
            | FieldValue::StatusAssignee(entities)
            | FieldValue::OrganizationSelect(entities)
            | FieldValue::GroupSelect(entities) => {
                let codes: Vec<&str> = entities.iter().map(|e| e.code.as_str()).collect();
                f.write_str(&codes.join(","))
            }
            FieldValue::Creator(entity) | FieldValue::Modifier(entity) => {
                f.write_str(&entity.code)
            }
            FieldValue::Subtable(_) => Ok(()),
        }
    }
}

/// Field values of a record, keyed by field code
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(code.into(), value)
    }

    pub fn get(&self, code: &str) -> Option<&FieldValue> {
        self.0.get(code)
    }

    pub fn remove(&mut self, code: &str) -> Option<FieldValue> {
        self.0.remove(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes writable fields as `{"code": {"value": ...}}`, leaving out `skip`.
    pub fn to_write_json(&self, skip: Option<&str>) -> Result<Value, serde_json::Error> {
        let mut obj = serde_json::Map::with_capacity(self.0.len());
        for (code, value) in &self.0 {
            if Some(code.as_str()) == skip || !value.is_writable() {
                continue;
            }
            obj.insert(
                code.clone(),
                serde_json::json!({ "value": value.write_value()? }),
            );
        }
        Ok(Value::Object(obj))
    }

    /// Builds fields from raw `{"type", "value"}` entries, skipping unknown kinds
    pub(crate) fn from_raw(raw: BTreeMap<String, RawField>) -> Result<Self, serde_json::Error> {
        let mut fields = Fields::new();
        for (code, field) in raw {
            match FieldValue::from_typed(&field.kind, field.value)? {
                Some(value) => {
                    fields.insert(code, value);
                }
                None => {
                    tracing::debug!(
                        code = %code,
                        kind = %field.kind,
                        "Skipping field of unknown type"
                    );
                }
            }
        }
        Ok(fields)
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RawField>::deserialize(deserializer)?;
        Fields::from_raw(raw).map_err(D::Error::custom)
    }
}

/// A field as it arrives on the wire, before its kind is interpreted
#[derive(Debug, Deserialize)]
pub(crate) struct RawField {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub value: Value,
}

/// Serializes fields in write form without cloning them
pub struct WriteFields<'a> {
    fields: &'a Fields,
    skip: Option<&'a str>,
}

impl<'a> WriteFields<'a> {
    pub fn new(fields: &'a Fields) -> Self {
        Self { fields, skip: None }
    }

    /// Leaves `code` out of the encoded map
    pub fn without(fields: &'a Fields, code: &'a str) -> Self {
        Self {
            fields,
            skip: Some(code),
        }
    }
}

impl Serialize for WriteFields<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error as _;

        let mut map = serializer.serialize_map(None)?;
        for (code, value) in self.fields.iter() {
            if Some(code.as_str()) == self.skip || !value.is_writable() {
                continue;
            }
            let value = value.write_value().map_err(S::Error::custom)?;
            map.serialize_entry(code, &serde_json::json!({ "value": value }))?;
        }
        map.end()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

mod number_text {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn format(n: f64) -> String {
        if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        }
    }

    /// Optional sign, digits with at most one decimal point, optional exponent
    pub fn is_decimal(text: &str) -> bool {
        let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((m, e)) => (m, Some(e)),
            None => (unsigned, None),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

        let mantissa_ok = !(int.is_empty() && frac.is_empty()) && digits(int) && digits(frac);
        let exponent_ok = exponent.map_or(true, |e| {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && digits(e)
        });
        mantissa_ok && exponent_ok
    }

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) if is_decimal(s.trim()) => Ok(Some(s.trim().to_string())),
            Value::String(s) => Err(D::Error::custom(format!("invalid number '{s}'"))),
            other => Err(D::Error::custom(format!("invalid number value: {other}"))),
        }
    }
}

mod size_text {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(n) => serializer.serialize_str(&n.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_u64()),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid file size '{s}': {e}"))),
            other => Err(D::Error::custom(format!("invalid file size: {other}"))),
        }
    }
}

mod date_text {
    use chrono::NaiveDate;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid date '{s}': {e}"))),
        }
    }
}

mod time_text {
    use chrono::NaiveTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid time '{s}': {e}"))),
        }
    }
}

mod datetime_text {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&format(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| D::Error::custom(format!("invalid datetime '{s}': {e}"))),
        }
    }
}
