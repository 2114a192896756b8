//! Loosely-typed configuration values.
//!
//! JSON configuration allows a value of any shape. Lists are never kept as
//! lists: they are flattened (however deeply nested) into a sorted set of
//! strings, so accumulating attributes can use set algebra and duplicates
//! collapse across inheritance layers.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// An ordered mapping of top-level keys to values.
pub type Document = IndexMap<String, ConfigValue>;

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// De-duplicated, flattened list contents.
    Set(BTreeSet<String>),
    /// Nested mapping, in document order.
    Map(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Convert a decoded JSON value, collapsing every list into a set.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Int(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => {
                let mut set = BTreeSet::new();
                flatten_into(items, &mut set);
                ConfigValue::Set(set)
            }
            Value::Object(map) => ConfigValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a decoded JSON object into a document.
    ///
    /// Returns `None` if the value is not an object.
    pub fn document_from_json(value: Value) -> Option<Document> {
        match ConfigValue::from_json(value) {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Convert back to a JSON value. Sets become sorted arrays.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Int(i) => Value::from(*i),
            ConfigValue::Float(f) => Value::from(*f),
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Set(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
            ConfigValue::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Build a set value from string-like items.
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConfigValue::Set(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the variant, for messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::Set(_) => "set",
            ConfigValue::Map(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            ConfigValue::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut BTreeSet<String>> {
        match self {
            ConfigValue::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Set view that treats a bare string as a one-element set.
    pub fn to_set(&self) -> Option<BTreeSet<String>> {
        match self {
            ConfigValue::Set(set) => Some(set.clone()),
            ConfigValue::String(s) => Some(BTreeSet::from([s.clone()])),
            ConfigValue::Null => Some(BTreeSet::new()),
            _ => None,
        }
    }
}

/// Remove `items` from `set`.
///
/// With `match_name`, an item removes every entry whose name portion (the
/// text before `=`) equals it, so `FOO` removes `FOO=1`.
pub fn remove_items(set: &mut BTreeSet<String>, items: &BTreeSet<String>, match_name: bool) {
    if match_name {
        set.retain(|entry| {
            let name = entry.split_once('=').map_or(entry.as_str(), |(n, _)| n);
            !items.contains(name) && !items.contains(entry)
        });
    } else {
        set.retain(|entry| !items.contains(entry));
    }
}

fn flatten_into(items: Vec<Value>, out: &mut BTreeSet<String>) {
    for item in items {
        match item {
            Value::Array(nested) => flatten_into(nested, out),
            Value::String(s) => {
                out.insert(s);
            }
            Value::Null => {}
            other => {
                out.insert(other.to_string());
            }
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => write!(f, "{s}"),
            ConfigValue::Set(_) | ConfigValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Int(i) => serializer.serialize_i64(*i),
            ConfigValue::Float(x) => serializer.serialize_f64(*x),
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::Set(set) => {
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for item in set {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<BTreeSet<String>> for ConfigValue {
    fn from(set: BTreeSet<String>) -> Self {
        ConfigValue::Set(set)
    }
}
