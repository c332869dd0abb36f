//! The metadata record shape: three fixed sections over a small value
//! algebra that makes index-eligibility decidable without reflection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the three fixed top-level sections of a [`MetadataRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    System,
    User,
    Plugin,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::System => "system",
            Section::User => "user",
            Section::Plugin => "plugin",
        }
    }

    /// Parses a section name, case-sensitively, returning `None` for any
    /// name other than the three known sections. Unknown sections are
    /// stored but never indexed.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Section::System),
            "user" => Some(Section::User),
            "plugin" => Some(Section::Plugin),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A metadata value.
///
/// Scalars (`Null`/`Bool`/`Int`/`Float`/`String`) are indexable; `List` and
/// `Map` are stored but never placed in the inverted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Canonical type name used by the `$type` query operator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A section's fields: name -> value.
pub type Fields = BTreeMap<String, Value>;

/// The three-section metadata document for one path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataRecord {
    pub system: Fields,
    pub user: Fields,
    pub plugin: Fields,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, section: Section) -> &Fields {
        match section {
            Section::System => &self.system,
            Section::User => &self.user,
            Section::Plugin => &self.plugin,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Fields {
        match section {
            Section::System => &mut self.system,
            Section::User => &mut self.user,
            Section::Plugin => &mut self.plugin,
        }
    }

    pub fn get(&self, section: Section, field: &str) -> Option<&Value> {
        self.section(section).get(field)
    }

    /// Iterates over every `(section, field, value)` triple the registry's
    /// index-maintenance needs to visit, skipping non-indexable values.
    pub fn indexable_triples(&self) -> impl Iterator<Item = (Section, &str, &Value)> {
        [Section::System, Section::User, Section::Plugin]
            .into_iter()
            .flat_map(move |section| {
                self.section(section)
                    .iter()
                    .filter(|(_, v)| v.is_scalar())
                    .map(move |(field, value)| (section, field.as_str(), value))
            })
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("system", &self.system)?;
        map.serialize_entry("user", &self.user)?;
        map.serialize_entry("plugin", &self.plugin)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetadataRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            system: Fields,
            #[serde(default)]
            user: Fields,
            #[serde(default)]
            plugin: Fields,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(MetadataRecord {
            system: raw.system,
            user: raw.user,
            plugin: raw.plugin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexable_triples_skips_lists_and_maps() {
        let mut rec = MetadataRecord::new();
        rec.user.insert("owner".into(), Value::from("Alice"));
        rec.user
            .insert("tags".into(), Value::List(vec![Value::from("work")]));

        let triples: Vec<_> = rec.indexable_triples().collect();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].1, "owner");
    }

    #[test]
    fn section_parse_rejects_unknown_names() {
        assert_eq!(Section::parse("system"), Some(Section::System));
        assert_eq!(Section::parse("exif"), None);
    }
}
