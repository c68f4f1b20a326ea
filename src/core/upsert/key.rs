//! Remote key lookup results

use crate::domain::{KeySelector, Record, RecordId};
use std::collections::HashMap;

/// Key values found in the store, with how many records carry each one
#[derive(Debug, Clone, Default)]
pub struct ExistingKeySet {
    matches: HashMap<String, Vec<Option<RecordId>>>,
}

impl ExistingKeySet {
    /// Indexes `records` by their value for `key`. Records without one are
    /// ignored.
    pub fn from_records<'a, I>(key: &KeySelector, records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut matches: HashMap<String, Vec<Option<RecordId>>> = HashMap::new();
        for record in records {
            if let Some(value) = key.key_of(record) {
                matches.entry(value).or_default().push(record.id.clone());
            }
        }
        Self { matches }
    }

    /// Number of remote records with this key value
    pub fn count(&self, value: &str) -> usize {
        self.matches.get(value).map_or(0, Vec::len)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.count(value) > 0
    }

    /// The id of the only record with this key value, when it was read
    pub fn single_id(&self, value: &str) -> Option<&RecordId> {
        match self.matches.get(value).map(Vec::as_slice) {
            Some([Some(id)]) => Some(id),
            _ => None,
        }
    }

    /// Distinct key values found
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;

    fn keyed(code: &str, id: u64) -> Record {
        Record::with_id(RecordId::from(id)).field("code", FieldValue::text(code))
    }

    #[test]
    fn test_counts_by_field() {
        let remote = vec![keyed("B", 1), keyed("C", 2), keyed("C", 3), Record::new()];
        let set = ExistingKeySet::from_records(&KeySelector::from("code"), &remote);

        assert_eq!(set.len(), 2);
        assert_eq!(set.count("A"), 0);
        assert_eq!(set.count("B"), 1);
        assert_eq!(set.count("C"), 2);
        assert!(set.contains("B"));
        assert!(!set.contains("A"));
    }

    #[test]
    fn test_single_id() {
        let remote = vec![keyed("B", 1), keyed("C", 2), keyed("C", 3)];
        let set = ExistingKeySet::from_records(&KeySelector::from("code"), &remote);

        assert_eq!(set.single_id("B"), Some(&RecordId::from(1u64)));
        assert_eq!(set.single_id("C"), None);
        assert_eq!(set.single_id("A"), None);
    }

    #[test]
    fn test_counts_by_record_id() {
        let remote = vec![Record::with_id(RecordId::from(7u64))];
        let set = ExistingKeySet::from_records(&KeySelector::RecordId, &remote);

        assert!(set.contains("7"));
        assert_eq!(set.single_id("7"), Some(&RecordId::from(7u64)));
    }
}
