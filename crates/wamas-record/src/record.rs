//! Ordered generic records

use crate::value::Value;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

/// An ordered mapping from field name to [`Value`]
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct GenericRecord {
    fields: IndexMap<String, Value>,
}

impl GenericRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object into a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJson`] for malformed input and
    /// [`Error::TypeMismatch`] when the top-level value is not an object.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(input)?;
        match Value::from_json(json) {
            Value::Record(record) => Ok(record),
            other => Err(Error::type_mismatch("object", other.type_name())),
        }
    }

    /// Serialize the record as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJson`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Insert or replace a field, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Get a field by exact key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a mutable field by exact key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Remove a field, preserving the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Look up a dotted path.
    ///
    /// An exact key match wins; otherwise the path is split on `.` and walked
    /// through nested records, with numeric segments indexing into lists.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;

        for segment in segments {
            current = match current {
                Value::Record(record) => record.get(segment)?,
                Value::List(items) => {
                    let index: usize = segment.parse().ok()?;
                    items.get(index)?
                }
                _ => {
                    trace!(path, segment, "path walks past a scalar");
                    return None;
                }
            };
        }
        Some(current)
    }

    /// Whether a dotted path resolves to any value, blank or not.
    pub fn has_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }
}

impl FromIterator<(String, Value)> for GenericRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for GenericRecord {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Extend<(String, Value)> for GenericRecord {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn despatch_advice() -> GenericRecord {
        GenericRecord::from_json_str(
            r##"{
                "DespatchAdvice": {
                    "cbc:ID": "WH/OUT/00042",
                    "cac:DespatchLine": [
                        {"cbc:ID": "1", "cbc:DeliveredQuantity": {"@unitCode": "C62", "#text": "5"}},
                        {"cbc:ID": "2"}
                    ]
                }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_get_path_walks_records_and_lists() {
        let record = despatch_advice();
        assert_eq!(
            record.get_path("DespatchAdvice.cbc:ID"),
            Some(&Value::from("WH/OUT/00042"))
        );
        assert_eq!(
            record.get_path("DespatchAdvice.cac:DespatchLine.1.cbc:ID"),
            Some(&Value::from("2"))
        );
        assert_eq!(
            record.get_path("DespatchAdvice.cac:DespatchLine.0.cbc:DeliveredQuantity.@unitCode"),
            Some(&Value::from("C62"))
        );
    }

    #[test]
    fn test_get_path_missing_segments() {
        let record = despatch_advice();
        assert!(record.get_path("DespatchAdvice.cac:DespatchLine.7.cbc:ID").is_none());
        assert!(record.get_path("DespatchAdvice.cbc:ID.deeper").is_none());
        assert!(record.get_path("Nope").is_none());
    }

    #[test]
    fn test_exact_key_wins_over_walk() {
        let mut record = GenericRecord::new();
        record.insert("a.b", "flat");
        let mut inner = GenericRecord::new();
        inner.insert("b", "nested");
        record.insert("a", inner);
        assert_eq!(record.get_path("a.b"), Some(&Value::from("flat")));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = GenericRecord::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut record = GenericRecord::new();
        record.insert("a", 1);
        record.insert("b", 2);
        record.insert("c", 3);
        record.remove("b");
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
