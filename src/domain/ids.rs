//! Domain identifier types with validation
//!
//! Newtype wrappers for kintone identifiers so app ids and record ids can't be
//! mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// kintone app identifier
///
/// App ids are positive integers; zero is rejected because the API treats it as
/// "no app".
///
/// # Examples
///
/// ```
/// use kinsync::domain::ids::AppId;
///
/// let app = AppId::new(1002).unwrap();
/// assert_eq!(app.get(), 1002);
/// assert!(AppId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AppId(u64);

impl AppId {
    /// Creates a new AppId
    pub fn new(id: u64) -> Result<Self, String> {
        if id == 0 {
            return Err("App ID is required (got 0)".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the numeric id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for AppId {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AppId> for u64 {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("Invalid app ID '{s}': {e}"))?;
        Self::new(id)
    }
}

/// Record identifier assigned by the record store
///
/// The API transports record ids as strings (`"42"`); they are kept as strings
/// here so they round-trip unchanged.
///
/// # Examples
///
/// ```
/// use kinsync::domain::ids::RecordId;
/// use std::str::FromStr;
///
/// let id = RecordId::from_str("42").unwrap();
/// assert_eq!(id.as_str(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new RecordId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Record ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the record ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
