//! Purpose: Hold one parsed record and its optional key list.
//! Exports: `Record`.
//! Role: Value type handed out by the cursor and accepted by the writer.
//! Invariants: Keyed records never hold more fields than keys.
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// One parsed record.
///
/// When keys are known the fields are truncated to the shorter of the two lists, so
/// `keys().len() == fields().len()` always holds for keyed records. Keys are never
/// deduplicated; `get` returns the first positional match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    keys: Option<Arc<[String]>>,
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { keys: None, fields }
    }

    pub(crate) fn zip(keys: Option<Arc<[String]>>, mut fields: Vec<String>) -> Self {
        if let Some(keys) = &keys {
            fields.truncate(keys.len());
        }
        Self { keys, fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn keys(&self) -> &[String] {
        match &self.keys {
            Some(keys) => &keys[..self.fields.len()],
            None => &[],
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.keys.is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let index = self.keys().iter().position(|candidate| candidate == key)?;
        self.fields.get(index).map(String::as_str)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys()
            .iter()
            .zip(&self.fields)
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Fields as writer cells; parsed fields are never null.
    pub fn cells(&self) -> impl Iterator<Item = Option<&str>> {
        self.fields.iter().map(|field| Some(field.as_str()))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_keyed() {
            let mut map = serializer.serialize_map(Some(self.fields.len()))?;
            for (key, value) in self.pairs() {
                map.serialize_entry(key, value)?;
            }
            map.end()
        } else {
            let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
            for field in &self.fields {
                seq.serialize_element(field)?;
            }
            seq.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use std::sync::Arc;

    fn keys(values: &[&str]) -> Option<Arc<[String]>> {
        Some(values.iter().map(|value| value.to_string()).collect())
    }

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn extra_fields_are_dropped() {
        let record = Record::zip(keys(&["a", "b"]), fields(&["1", "2", "3"]));
        assert_eq!(record.fields(), &["1".to_string(), "2".to_string()]);
        assert_eq!(record.get("b"), Some("2"));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let record = Record::zip(keys(&["a", "b", "c"]), fields(&["1"]));
        assert_eq!(record.keys(), &["a".to_string()]);
        assert_eq!(record.get("b"), None);
    }

    #[test]
    fn duplicate_keys_are_not_merged() {
        let record = Record::zip(keys(&["x", "x"]), fields(&["1", "2"]));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("x"), Some("1"));
        let pairs: Vec<_> = record.pairs().collect();
        assert_eq!(pairs, vec![("x", "1"), ("x", "2")]);
    }

    #[test]
    fn serializes_as_object_or_array() {
        let keyed = Record::zip(keys(&["id", "name"]), fields(&["7", "ann"]));
        assert_eq!(
            serde_json::to_string(&keyed).expect("json"),
            r#"{"id":"7","name":"ann"}"#
        );
        let plain = Record::new(fields(&["7", "ann"]));
        assert_eq!(serde_json::to_string(&plain).expect("json"), r#"["7","ann"]"#);
    }
}
