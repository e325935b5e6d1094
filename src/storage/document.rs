//! In-memory document: named collections of flat records
//!
//! The document is the whole database. It serializes to a single JSON
//! object whose keys are collection names and whose values are arrays of
//! records, in insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record: field name to scalar value
pub type Record = Map<String, Value>;

/// Collections every fresh document starts with
pub const DEFAULT_COLLECTIONS: [&str; 5] =
    ["users", "projects", "applications", "submissions", "reviews"];

/// Named collections of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    collections: IndexMap<String, Vec<Record>>,
}

impl Document {
    /// Empty document with no collections
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding the marketplace collections, all empty
    pub fn with_default_collections() -> Self {
        let mut document = Self::new();
        for name in DEFAULT_COLLECTIONS {
            document.ensure_collection(name);
        }
        document
    }

    /// Records of a collection; a missing collection reads as empty
    pub fn collection(&self, name: &str) -> &[Record] {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mutable access to a collection, creating it on first use
    pub fn collection_mut(&mut self, name: &str) -> &mut Vec<Record> {
        self.collections.entry(name.to_string()).or_default()
    }

    /// Mutable access to an existing collection only
    pub fn existing_mut(&mut self, name: &str) -> Option<&mut Vec<Record>> {
        self.collections.get_mut(name)
    }

    /// Declare a collection; returns true when it did not exist before
    pub fn ensure_collection(&mut self, name: &str) -> bool {
        if self.collections.contains_key(name) {
            return false;
        }
        self.collections.insert(name.to_string(), Vec::new());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Collection names in declaration order
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Total number of records across all collections
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_missing_collection_reads_empty() {
        let document = Document::new();
        assert!(document.collection("projects").is_empty());
        assert!(!document.contains("projects"));
    }

    #[test]
    fn test_collection_mut_creates() {
        let mut document = Document::new();
        document
            .collection_mut("reviews")
            .push(record(json!({"id": "r1"})));

        assert!(document.contains("reviews"));
        assert_eq!(document.collection("reviews").len(), 1);
        assert_eq!(document.record_count(), 1);
    }

    #[test]
    fn test_ensure_collection_keeps_existing_records() {
        let mut document = Document::with_default_collections();
        document
            .collection_mut("users")
            .push(record(json!({"id": "u1"})));

        assert!(!document.ensure_collection("users"));
        assert!(document.ensure_collection("messages"));
        assert_eq!(document.collection("users").len(), 1);
    }

    #[test]
    fn test_serialized_layout() {
        let mut document = Document::new();
        document
            .collection_mut("users")
            .push(record(json!({"id": "u1", "name": "Ada"})));
        document.ensure_collection("projects");

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json, json!({"users": [{"id": "u1", "name": "Ada"}], "projects": []}));

        let names: Vec<&str> = document.collection_names().collect();
        assert_eq!(names, vec!["users", "projects"]);
    }
}
