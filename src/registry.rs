//! In-memory primary-plus-inverted-index structure: a primary path -> record
//! map alongside a three-level `section -> field -> value -> paths` index.
//! Removal walks only the record being replaced rather than the whole
//! table, so `add`/`update`/`remove` stay proportional to one record's
//! field count.

use crate::model::{MetadataRecord, Section, Value};
use std::collections::{HashMap, HashSet};

/// A hashable, totally-ordered projection of an indexable [`Value`].
///
/// `f64` is neither `Hash` nor `Eq`, so floats are keyed by bit pattern
/// (`NaN` therefore indexes as a single canonical bucket, which is fine:
/// nothing in the query language compares a field for equality with NaN
/// meaningfully).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl IndexKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Int(i) => Some(IndexKey::Int(*i)),
            Value::Float(f) => Some(IndexKey::Float(f.to_bits())),
            Value::String(s) => Some(IndexKey::String(s.clone())),
            Value::List(_) | Value::Map(_) => None,
        }
    }
}

type ValueBuckets = HashMap<IndexKey, HashSet<String>>;
type FieldIndex = HashMap<String, ValueBuckets>;
type InvertedIndex = HashMap<Section, FieldIndex>;

/// The metadata registry: owns the primary map; inverted indexes hold only
/// path strings.
#[derive(Debug, Default)]
pub struct Registry {
    primary: HashMap<String, MetadataRecord>,
    inverted: InvertedIndex,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts; overwrites if present (removal of prior index entries
    /// happens first, so stale buckets never outlive the record).
    pub fn add(&mut self, path: &str, record: MetadataRecord) {
        self.deindex(path);
        self.index(path, &record);
        self.primary.insert(path.to_string(), record);
    }

    pub fn get(&self, path: &str) -> Option<&MetadataRecord> {
        self.primary.get(path)
    }

    /// Equivalent to [`Registry::add`]; fully reindexes.
    pub fn update(&mut self, path: &str, record: MetadataRecord) {
        self.add(path, record);
    }

    /// Removes from primary and all inverted indexes. Idempotent.
    pub fn remove(&mut self, path: &str) {
        self.deindex(path);
        self.primary.remove(path);
    }

    /// Snapshot of primary keys; no ordering guarantee.
    pub fn all_paths(&self) -> Vec<String> {
        self.primary.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Whether `(section, field)` has ever held an indexable scalar on any
    /// currently-registered record. Lets the query engine distinguish "no
    /// record has this field with this value" (authoritative, trust the
    /// index) from "this field is never indexed, fall back to scan."
    pub fn is_indexed(&self, section: Section, field: &str) -> bool {
        self.inverted
            .get(&section)
            .map(|f| f.contains_key(field))
            .unwrap_or(false)
    }

    /// O(1 + k) lookup; empty set when the section/field/value is unknown.
    pub fn find_by_field(&self, section: Section, field: &str, value: &Value) -> HashSet<String> {
        let Some(key) = IndexKey::from_value(value) else {
            return HashSet::new();
        };
        self.inverted
            .get(&section)
            .and_then(|f| f.get(field))
            .and_then(|buckets| buckets.get(&key))
            .cloned()
            .unwrap_or_default()
    }

    fn index(&mut self, path: &str, record: &MetadataRecord) {
        for (section, field, value) in record.indexable_triples() {
            let Some(key) = IndexKey::from_value(value) else {
                continue;
            };
            self.inverted
                .entry(section)
                .or_default()
                .entry(field.to_string())
                .or_default()
                .entry(key)
                .or_default()
                .insert(path.to_string());
        }
    }

    fn deindex(&mut self, path: &str) {
        let Some(record) = self.primary.get(path) else {
            return;
        };
        // Collect triples before mutating `self.inverted` to avoid a
        // double borrow against `self.primary`.
        let triples: Vec<(Section, String, IndexKey)> = record
            .indexable_triples()
            .filter_map(|(section, field, value)| {
                IndexKey::from_value(value).map(|key| (section, field.to_string(), key))
            })
            .collect();

        for (section, field, key) in triples {
            let Some(field_index) = self.inverted.get_mut(&section) else {
                continue;
            };
            let Some(buckets) = field_index.get_mut(&field) else {
                continue;
            };
            let Some(paths) = buckets.get_mut(&key) else {
                continue;
            };
            paths.remove(path);
            if paths.is_empty() {
                buckets.remove(&key);
            }
            if buckets.is_empty() {
                field_index.remove(&field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn rec_with(section: Section, field: &str, value: Value) -> MetadataRecord {
        let mut rec = MetadataRecord::new();
        rec.section_mut(section).insert(field.to_string(), value);
        rec
    }

    #[test]
    fn round_trip_find_by_field() {
        let mut reg = Registry::new();
        reg.add("a.txt", rec_with(Section::User, "owner", Value::from("Alice")));

        let hits = reg.find_by_field(Section::User, "owner", &Value::from("Alice"));
        assert_eq!(hits, HashSet::from(["a.txt".to_string()]));
    }

    #[test]
    fn update_reindexes_away_old_value() {
        let mut reg = Registry::new();
        reg.add("x", rec_with(Section::User, "owner", Value::from("Alice")));
        reg.update("x", rec_with(Section::User, "owner", Value::from("Bob")));

        assert!(reg
            .find_by_field(Section::User, "owner", &Value::from("Alice"))
            .is_empty());
        assert_eq!(
            reg.find_by_field(Section::User, "owner", &Value::from("Bob")),
            HashSet::from(["x".to_string()])
        );
    }

    #[test]
    fn remove_is_idempotent_and_clears_empty_shells() {
        let mut reg = Registry::new();
        reg.add("x", rec_with(Section::User, "owner", Value::from("Alice")));
        reg.remove("x");
        reg.remove("x");

        assert!(reg.get("x").is_none());
        assert!(!reg.is_indexed(Section::User, "owner"));
    }

    #[test]
    fn lists_and_maps_are_stored_but_not_indexed() {
        let mut reg = Registry::new();
        let mut rec = MetadataRecord::new();
        rec.user.insert(
            "tags".to_string(),
            Value::List(vec![Value::from("work")]),
        );
        reg.add("a", rec);

        assert!(reg.get("a").is_some());
        assert!(!reg.is_indexed(Section::User, "tags"));
    }

    #[test]
    fn unknown_section_or_value_returns_empty_not_panic() {
        let reg = Registry::new();
        assert!(reg
            .find_by_field(Section::System, "size", &Value::Int(5))
            .is_empty());
    }
}
