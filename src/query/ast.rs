//! Parses a query document into a small clause tree.

use super::operator::Operator;
use crate::error::{FileMetaError, Result};
use crate::model::{Section, Value};
use serde_json::Value as Json;

/// What to test a resolved `(section, field)` against.
#[derive(Debug, Clone)]
pub enum FieldTest {
    /// Plain equality — eligible for the inverted-index fast path.
    Equals(Value),
    /// One or more operators under one field, implicitly ANDed.
    Operators(Vec<Operator>),
}

/// A single query clause.
#[derive(Debug, Clone)]
pub enum Clause {
    /// `section` is `None` when the key names a section other than
    /// `system`/`user`/`plugin` — such a clause can never match any record,
    /// since every record has exactly those three sections.
    Field {
        section: Option<Section>,
        field: String,
        test: FieldTest,
    },
    And(Vec<Clause>),
    Or(Vec<Clause>),
    Not(Box<Clause>),
}

/// Splits a query key into `(section, field)`. A bare key defaults to
/// `user`; only the first `.` separates section from field, so subsequent
/// dots are part of the field name.
fn parse_field_key(key: &str) -> (Option<Section>, String) {
    match key.split_once('.') {
        Some((section, field)) => (Section::parse(section), field.to_string()),
        None => (Some(Section::User), key.to_string()),
    }
}

fn parse_operator(name: &str, value: &Json) -> Result<Operator> {
    let malformed = |msg: String| FileMetaError::Query(msg);

    Ok(match name {
        "$eq" => Operator::Eq(Value::from_json(value.clone())),
        "$ne" => Operator::Ne(Value::from_json(value.clone())),
        "$gt" => Operator::Gt(Value::from_json(value.clone())),
        "$gte" => Operator::Gte(Value::from_json(value.clone())),
        "$lt" => Operator::Lt(Value::from_json(value.clone())),
        "$lte" => Operator::Lte(Value::from_json(value.clone())),
        "$in" => Operator::In(json_array(value, malformed("$in requires a list".into()))?),
        "$nin" => Operator::Nin(json_array(value, malformed("$nin requires a list".into()))?),
        "$contains" => Operator::Contains(Value::from_json(value.clone())),
        "$startswith" => Operator::StartsWith(json_string(value, "$startswith")?),
        "$endswith" => Operator::EndsWith(json_string(value, "$endswith")?),
        "$regex" => Operator::Regex(json_string(value, "$regex")?),
        "$exists" => Operator::Exists(
            value
                .as_bool()
                .ok_or_else(|| malformed("$exists requires a boolean".into()))?,
        ),
        "$type" => Operator::TypeName(json_string(value, "$type")?),
        other => return Err(malformed(format!("unknown operator '{other}'"))),
    })
}

fn json_array(value: &Json, err: FileMetaError) -> Result<Vec<Value>> {
    value
        .as_array()
        .map(|items| items.iter().cloned().map(Value::from_json).collect())
        .ok_or(err)
}

fn json_string(value: &Json, op: &str) -> Result<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| FileMetaError::Query(format!("{op} requires a string argument")))
}

/// Whether every key in `obj` starts with `$`, i.e. this is an
/// operator-expression rather than a nested field path.
fn is_operator_expression(obj: &serde_json::Map<String, Json>) -> bool {
    !obj.is_empty() && obj.keys().all(|k| k.starts_with('$'))
}

fn parse_clause_list(value: &Json, op: &str) -> Result<Vec<Clause>> {
    value
        .as_array()
        .ok_or_else(|| FileMetaError::Query(format!("{op} requires a list of sub-queries")))?
        .iter()
        .map(parse_query)
        .collect()
}

/// Parses one query mapping into an implicit top-level `And` of its
/// entries — the engine folds query entries left-to-right, intersecting.
pub fn parse_query(value: &Json) -> Result<Clause> {
    let obj = value
        .as_object()
        .ok_or_else(|| FileMetaError::Query("query must be a JSON object".to_string()))?;

    let mut clauses = Vec::with_capacity(obj.len());
    for (key, val) in obj {
        clauses.push(parse_entry(key, val)?);
    }
    Ok(Clause::And(clauses))
}

fn parse_entry(key: &str, value: &Json) -> Result<Clause> {
    match key {
        "$and" => Ok(Clause::And(parse_clause_list(value, "$and")?)),
        "$or" => Ok(Clause::Or(parse_clause_list(value, "$or")?)),
        "$not" => Ok(Clause::Not(Box::new(parse_query(value)?))),
        _ if key.starts_with('$') => {
            Err(FileMetaError::Query(format!("unknown top-level operator '{key}'")))
        }
        _ => {
            let (section, field) = parse_field_key(key);
            let test = match value.as_object().filter(|o| is_operator_expression(o)) {
                Some(ops) => {
                    let mut parsed = Vec::with_capacity(ops.len());
                    for (op_name, op_value) in ops {
                        parsed.push(parse_operator(op_name, op_value)?);
                    }
                    FieldTest::Operators(parsed)
                }
                None => FieldTest::Equals(Value::from_json(value.clone())),
            };
            Ok(Clause::Field { section, field, test })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_key_defaults_to_user_section() {
        let clause = parse_entry("owner", &json!("Alice")).unwrap();
        match clause {
            Clause::Field { section, field, .. } => {
                assert_eq!(section, Some(Section::User));
                assert_eq!(field, "owner");
            }
            _ => panic!("expected field clause"),
        }
    }

    #[test]
    fn explicit_section_is_split_on_first_dot_only() {
        let clause = parse_entry("user.a.b", &json!(1)).unwrap();
        match clause {
            Clause::Field { section, field, .. } => {
                assert_eq!(section, Some(Section::User));
                assert_eq!(field, "a.b");
            }
            _ => panic!("expected field clause"),
        }
    }

    #[test]
    fn unknown_section_parses_to_none() {
        let clause = parse_entry("exif.make", &json!("Canon")).unwrap();
        match clause {
            Clause::Field { section, .. } => assert_eq!(section, None),
            _ => panic!("expected field clause"),
        }
    }

    #[test]
    fn and_requires_a_list() {
        let err = parse_query(&json!({"$and": {"a": 1}})).unwrap_err();
        assert!(matches!(err, FileMetaError::Query(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = parse_query(&json!({"size": {"$wat": 1}})).unwrap_err();
        assert!(matches!(err, FileMetaError::Query(_)));
    }
}
