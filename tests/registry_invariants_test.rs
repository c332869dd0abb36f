//! Quantified invariants of the registry and query engine, exercised
//! directly rather than through the manager façade: round-tripping,
//! reindexing, idempotent delete, and query-algebra identities like
//! double-negation and associativity of `$and`.

use filemeta::{query, MetadataRecord, Registry, Section, Value};
use std::collections::HashSet;

fn record_with(field: &str, value: Value) -> MetadataRecord {
    let mut rec = MetadataRecord::new();
    rec.user.insert(field.to_string(), value);
    rec
}

#[test]
fn round_trip_holds_until_mutated_away() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));

    assert_eq!(
        reg.find_by_field(Section::User, "owner", &Value::from("Alice")),
        HashSet::from(["a".to_string()])
    );

    reg.update("a", record_with("owner", Value::from("Bob")));
    assert!(reg.find_by_field(Section::User, "owner", &Value::from("Alice")).is_empty());
}

#[test]
fn reindex_correctness_no_stale_bucket_survives_update() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));
    reg.update("a", record_with("owner", Value::from("Bob")));

    // The old value's bucket must be gone entirely, not merely empty for "a".
    assert!(!reg.is_indexed(Section::User, "owner") || reg.find_by_field(Section::User, "owner", &Value::from("Alice")).is_empty());
}

#[test]
fn idempotent_delete() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));
    reg.remove("a");
    let after_one = reg.all_paths();
    reg.remove("a");
    let after_two = reg.all_paths();
    assert_eq!(after_one, after_two);
    assert!(after_two.is_empty());
}

#[test]
fn equality_query_matches_full_scan_equivalent() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));
    reg.add("b", record_with("owner", Value::from("Bob")));
    reg.add("c", record_with("owner", Value::from("Alice")));

    let indexed = query::execute(&reg, &serde_json::json!({"owner": "Alice"})).unwrap();

    let scanned: HashSet<String> = reg
        .all_paths()
        .into_iter()
        .filter(|p| reg.get(p).and_then(|r| r.get(Section::User, "owner")) == Some(&Value::from("Alice")))
        .collect();

    assert_eq!(indexed, scanned);
}

#[test]
fn and_is_associative_and_commutative_up_to_set_equality() {
    let mut reg = Registry::new();
    for (path, owner, tag) in [("a", "Alice", "work"), ("b", "Alice", "home"), ("c", "Bob", "work")] {
        let mut rec = MetadataRecord::new();
        rec.user.insert("owner".to_string(), Value::from(owner));
        rec.user.insert("tag".to_string(), Value::from(tag));
        reg.add(path, rec);
    }

    let left = query::execute(
        &reg,
        &serde_json::json!({"$and": [{"owner": "Alice"}, {"tag": "work"}]}),
    )
    .unwrap();
    let right = query::execute(
        &reg,
        &serde_json::json!({"$and": [{"tag": "work"}, {"owner": "Alice"}]}),
    )
    .unwrap();
    assert_eq!(left, right);
    assert_eq!(left, HashSet::from(["a".to_string()]));
}

#[test]
fn double_not_is_identity() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));
    reg.add("b", record_with("owner", Value::from("Bob")));

    let base = query::execute(&reg, &serde_json::json!({"owner": "Alice"})).unwrap();
    let double_negated = query::execute(&reg, &serde_json::json!({"$not": {"$not": {"owner": "Alice"}}})).unwrap();
    assert_eq!(base, double_negated);
}

#[test]
fn or_of_one_clause_is_that_clause() {
    let mut reg = Registry::new();
    reg.add("a", record_with("owner", Value::from("Alice")));
    reg.add("b", record_with("owner", Value::from("Bob")));

    let base = query::execute(&reg, &serde_json::json!({"owner": "Alice"})).unwrap();
    let wrapped = query::execute(&reg, &serde_json::json!({"$or": [{"owner": "Alice"}]})).unwrap();
    assert_eq!(base, wrapped);
}

#[test]
fn only_scalars_are_indexed_lists_and_maps_are_not() {
    let mut reg = Registry::new();
    let mut rec = MetadataRecord::new();
    rec.user.insert("tags".to_string(), Value::List(vec![Value::from("a")]));
    reg.add("x", rec);

    assert!(!reg.is_indexed(Section::User, "tags"));
    assert!(reg.get("x").is_some());
}
