//! Single-pass intersective folder over a parsed clause tree.

use super::ast::{parse_query, Clause, FieldTest};
use crate::error::Result;
use crate::model::Section;
use crate::registry::Registry;
use serde_json::Value as Json;
use std::collections::HashSet;

/// Executes a query document against the registry, returning the matching
/// paths. Starts from the universe of all known paths and folds query
/// entries left-to-right, intersecting.
pub fn execute(registry: &Registry, query: &Json) -> Result<HashSet<String>> {
    let clause = parse_query(query)?;
    let universe: HashSet<String> = registry.all_paths().into_iter().collect();
    Ok(eval_clause(registry, &universe, &clause))
}

fn eval_clause(registry: &Registry, working: &HashSet<String>, clause: &Clause) -> HashSet<String> {
    match clause {
        Clause::And(clauses) => {
            let mut acc = working.clone();
            for c in clauses {
                acc = eval_clause(registry, &acc, c);
            }
            acc
        }
        Clause::Or(clauses) => {
            let mut acc = HashSet::new();
            for c in clauses {
                acc.extend(eval_clause(registry, working, c));
            }
            acc
        }
        Clause::Not(inner) => {
            let excluded = eval_clause(registry, working, inner);
            working.difference(&excluded).cloned().collect()
        }
        Clause::Field { section, field, test } => {
            eval_field(registry, working, *section, field, test)
        }
    }
}

fn eval_field(
    registry: &Registry,
    working: &HashSet<String>,
    section: Option<Section>,
    field: &str,
    test: &FieldTest,
) -> HashSet<String> {
    // A key addressing a section other than system/user/plugin can never
    // match: every record has exactly those three sections.
    let Some(section) = section else {
        return HashSet::new();
    };

    match test {
        FieldTest::Equals(value) => {
            if value.is_scalar() && registry.is_indexed(section, field) {
                let hits = registry.find_by_field(section, field, value);
                return working.intersection(&hits).cloned().collect();
            }
            working
                .iter()
                .filter(|path| {
                    registry
                        .get(path)
                        .and_then(|rec| rec.get(section, field))
                        .map(|v| v == value)
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        }
        FieldTest::Operators(ops) => working
            .iter()
            .filter(|path| {
                let rec = registry.get(path);
                let field_value = rec.and_then(|r| r.get(section, field));
                ops.iter().all(|op| op.matches(field_value))
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetadataRecord, Value};
    use serde_json::json;

    fn registry_with(entries: &[(&str, &str, Value)]) -> Registry {
        let mut reg = Registry::new();
        for (path, field, value) in entries {
            let mut rec = MetadataRecord::new();
            rec.user.insert(field.to_string(), value.clone());
            reg.add(path, rec);
        }
        reg
    }

    #[test]
    fn equality_uses_index_and_falls_back_to_scan() {
        let reg = registry_with(&[
            ("a", "color", Value::from("red")),
            ("b", "color", Value::from("blue")),
        ]);
        let hits = execute(&reg, &json!({"color": "red"})).unwrap();
        assert_eq!(hits, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn or_of_equalities() {
        let reg = registry_with(&[
            ("a", "color", Value::from("red")),
            ("b", "color", Value::from("green")),
            ("c", "color", Value::from("blue")),
        ]);
        let hits = execute(
            &reg,
            &json!({"$or": [{"color": "red"}, {"color": "blue"}]}),
        )
        .unwrap();
        assert_eq!(hits, HashSet::from(["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn not_restarts_from_working_set() {
        let reg = registry_with(&[
            ("a", "color", Value::from("red")),
            ("b", "color", Value::from("green")),
            ("c", "color", Value::from("blue")),
        ]);
        let hits = execute(&reg, &json!({"$not": {"color": "green"}})).unwrap();
        assert_eq!(hits, HashSet::from(["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn operator_bag_is_implicit_and() {
        let mut reg = Registry::new();
        let mut rec = MetadataRecord::new();
        rec.user.insert("w".to_string(), Value::Int(1920));
        reg.add("big.png", rec);
        let mut rec2 = MetadataRecord::new();
        rec2.user.insert("w".to_string(), Value::Int(100));
        reg.add("small.png", rec2);

        let hits = execute(&reg, &json!({"w": {"$gt": 1000, "$lt": 4000}})).unwrap();
        assert_eq!(hits, HashSet::from(["big.png".to_string()]));
    }

    #[test]
    fn unknown_section_never_matches() {
        let reg = registry_with(&[("a", "owner", Value::from("Alice"))]);
        let hits = execute(&reg, &json!({"exif.make": "Canon"})).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn malformed_query_raises() {
        let reg = Registry::new();
        let err = execute(&reg, &json!({"$and": "nope"})).unwrap_err();
        assert!(matches!(err, crate::error::FileMetaError::Query(_)));
    }
}
