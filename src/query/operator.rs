//! A tagged operator enum with one evaluator, rather than one method per
//! operator — adding a comparison means adding a variant and a match arm,
//! not hunting down every call site that dispatches on operator name.

use crate::model::Value;
use regex::Regex;

/// One comparison operator applied to a single field's value.
#[derive(Debug, Clone)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Contains(Value),
    StartsWith(String),
    EndsWith(String),
    Regex(String),
    Exists(bool),
    TypeName(String),
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "$eq",
            Operator::Ne(_) => "$ne",
            Operator::Gt(_) => "$gt",
            Operator::Gte(_) => "$gte",
            Operator::Lt(_) => "$lt",
            Operator::Lte(_) => "$lte",
            Operator::In(_) => "$in",
            Operator::Nin(_) => "$nin",
            Operator::Contains(_) => "$contains",
            Operator::StartsWith(_) => "$startswith",
            Operator::EndsWith(_) => "$endswith",
            Operator::Regex(_) => "$regex",
            Operator::Exists(_) => "$exists",
            Operator::TypeName(_) => "$type",
        }
    }

    /// Applies this operator to a field's current value (`None` when the
    /// field is absent from the record). Never panics or raises — regex
    /// compile failures and type mismatches degrade to `false`.
    pub fn matches(&self, field_value: Option<&Value>) -> bool {
        // $exists is the only operator whose absent-field case isn't
        // unconditionally false.
        if let Operator::Exists(expected) = self {
            return field_value.is_some() == *expected;
        }

        let Some(field_value) = field_value else {
            return false;
        };

        match self {
            Operator::Eq(v) => field_value == v,
            Operator::Ne(v) => field_value != v,
            Operator::Gt(v) => numeric_cmp(field_value, v, |a, b| a > b),
            Operator::Gte(v) => numeric_cmp(field_value, v, |a, b| a >= b),
            Operator::Lt(v) => numeric_cmp(field_value, v, |a, b| a < b),
            Operator::Lte(v) => numeric_cmp(field_value, v, |a, b| a <= b),
            Operator::In(list) => list.contains(field_value),
            Operator::Nin(list) => !list.contains(field_value),
            Operator::Contains(needle) => contains(field_value, needle),
            Operator::StartsWith(prefix) => {
                field_value.as_str().map(|s| s.starts_with(prefix.as_str())).unwrap_or(false)
            }
            Operator::EndsWith(suffix) => {
                field_value.as_str().map(|s| s.ends_with(suffix.as_str())).unwrap_or(false)
            }
            Operator::Regex(pattern) => field_value
                .as_str()
                .map(|s| match Regex::new(pattern) {
                    Ok(re) => re.is_match(s),
                    Err(_) => false,
                })
                .unwrap_or(false),
            Operator::TypeName(expected) => field_value.type_name() == expected,
            Operator::Exists(_) => unreachable!("handled above"),
        }
    }
}

fn numeric_cmp(a: &Value, b: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle.as_str().map(|n| s.contains(n)).unwrap_or(false),
        Value::List(items) => items.contains(needle),
        Value::Map(map) => {
            let key_match = needle.as_str().map(|k| map.contains_key(k)).unwrap_or(false);
            key_match || map.values().any(|v| v == needle)
        }
        _ => false,
    }
}
