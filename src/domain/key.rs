//! Upsert key selection

use super::record::Record;
use std::fmt;

/// Identifies which value decides whether a record already exists remotely
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum KeySelector {
    /// The record id
    #[default]
    RecordId,
    /// A field whose values are unique within the app
    Field(String),
}

impl KeySelector {
    /// Field code the store uses for record ids in queries
    pub const ID_FIELD: &'static str = "$id";

    /// Field code used in conditions and projections
    pub fn field_code(&self) -> &str {
        match self {
            KeySelector::RecordId => Self::ID_FIELD,
            KeySelector::Field(code) => code,
        }
    }

    /// The record's key value, or `None` when it has none
    pub fn key_of(&self, record: &Record) -> Option<String> {
        let key = match self {
            KeySelector::RecordId => record.id.as_ref().map(|id| id.as_str().to_string()),
            KeySelector::Field(code) => record.get(code).map(ToString::to_string),
        };
        key.filter(|k| !k.is_empty())
    }
}

/// `""` and `"$id"` select the record id; anything else names a field
impl From<&str> for KeySelector {
    fn from(code: &str) -> Self {
        match code {
            "" | KeySelector::ID_FIELD => KeySelector::RecordId,
            other => KeySelector::Field(other.to_string()),
        }
    }
}

impl From<Option<&str>> for KeySelector {
    fn from(code: Option<&str>) -> Self {
        code.map(KeySelector::from).unwrap_or_default()
    }
}

impl fmt::Display for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_code())
    }
}
