//! Refined output values and the merge step.
//!
//! A template produces a [`Refined`] base shape; attachment results are then
//! merged into it. Merge behaviour depends only on the variant, so a template
//! may return a generic ordered map or a named [`Record`] and both accept
//! attachments uniformly.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use std::fmt;

/// Output of a refinery
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Refined {
    #[default]
    Null,
    /// Opaque template output (scalars, flat lists, untouched objects)
    Value(Value),
    /// Ordered key-value map
    Map(IndexMap<String, Refined>),
    /// Named structured record
    Record(Record),
    /// One refined element per element of a collection
    Seq(Vec<Refined>),
}

/// Structured record with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: IndexMap<String, Refined>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Refined>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a named field, replacing any previous value in place
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Refined>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Refined> {
        self.fields.get(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &IndexMap<String, Refined> {
        &self.fields
    }
}

impl Refined {
    pub fn is_null(&self) -> bool {
        matches!(self, Refined::Null | Refined::Value(Value::Null))
    }

    /// Look up a key on a map or record. Plain JSON values are opaque; use
    /// [`Refined::to_json`] to read into them.
    pub fn get(&self, key: &str) -> Option<&Refined> {
        match self {
            Refined::Map(map) => map.get(key),
            Refined::Record(record) => record.get(key),
            _ => None,
        }
    }

    /// Elements of a refined collection
    pub fn as_seq(&self) -> Option<&[Refined]> {
        match self {
            Refined::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to a plain JSON value. Records become objects.
    pub fn to_json(&self) -> Value {
        match self {
            Refined::Null => Value::Null,
            Refined::Value(v) => v.clone(),
            Refined::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Refined::Record(record) => Value::Object(
                record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Refined::Seq(items) => Value::Array(items.iter().map(Refined::to_json).collect()),
        }
    }

    /// Keyed entries this value contributes when merged into another value.
    ///
    /// Sequences and arrays are keyed by index; scalars contribute nothing.
    fn into_entries(self) -> Vec<(String, Refined)> {
        match self {
            Refined::Map(map) => map.into_iter().collect(),
            Refined::Record(record) => record.fields.into_iter().collect(),
            Refined::Value(Value::Object(obj)) => {
                obj.into_iter().map(|(k, v)| (k, Refined::Value(v))).collect()
            }
            Refined::Value(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), Refined::Value(v)))
                .collect(),
            Refined::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Refined::Null | Refined::Value(_) => Vec::new(),
        }
    }
}

/// Combine a template's base shape with attachment results.
///
/// - map + map: shallow union, `additions` win on conflicting keys
/// - map + anything else: each entry of `additions` is set by key
/// - record + anything: each entry of `additions` is set as a named field
///
/// A JSON object counts as a map. Any other `original` cannot hold keyed
/// entries and is returned unchanged.
pub fn merge(original: Refined, additions: Refined) -> Refined {
    match (original, additions) {
        (Refined::Map(mut map), Refined::Map(extra)) => {
            map.extend(extra);
            Refined::Map(map)
        }
        (Refined::Map(mut map), other) => {
            for (key, value) in other.into_entries() {
                map.insert(key, value);
            }
            Refined::Map(map)
        }
        (Refined::Value(Value::Object(obj)), additions) => {
            let map = obj.into_iter().map(|(k, v)| (k, Refined::Value(v))).collect();
            merge(Refined::Map(map), additions)
        }
        (Refined::Record(mut record), additions) => {
            for (field, value) in additions.into_entries() {
                record.set(field, value);
            }
            Refined::Record(record)
        }
        (original, additions) => {
            let dropped = additions.into_entries().len();
            if dropped > 0 {
                tracing::warn!(
                    "Cannot merge {} attachment(s) into non-keyed output {}",
                    dropped,
                    original
                );
            }
            original
        }
    }
}

impl From<Value> for Refined {
    fn from(value: Value) -> Self {
        Refined::Value(value)
    }
}

impl From<Record> for Refined {
    fn from(record: Record) -> Self {
        Refined::Record(record)
    }
}

impl From<IndexMap<String, Refined>> for Refined {
    fn from(map: IndexMap<String, Refined>) -> Self {
        Refined::Map(map)
    }
}

impl From<Vec<Refined>> for Refined {
    fn from(items: Vec<Refined>) -> Self {
        Refined::Seq(items)
    }
}

impl From<&str> for Refined {
    fn from(s: &str) -> Self {
        Refined::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Refined {
    fn from(s: String) -> Self {
        Refined::Value(Value::String(s))
    }
}

impl<K: Into<String>, V: Into<Refined>> FromIterator<(K, V)> for Refined {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Refined::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for Refined {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Refined::Null => serializer.serialize_unit(),
            Refined::Value(v) => v.serialize(serializer),
            Refined::Map(map) => serialize_fields(map, serializer),
            Refined::Record(record) => serialize_fields(&record.fields, serializer),
            Refined::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

fn serialize_fields<S: Serializer>(
    fields: &IndexMap<String, Refined>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (k, v) in fields {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

impl fmt::Display for Refined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refined::Null => write!(f, "null"),
            Refined::Value(v) => write!(f, "{}", v),
            Refined::Record(r) => write!(f, "{} {}", r.name, self.to_json()),
            Refined::Map(_) | Refined::Seq(_) => write!(f, "{}", self.to_json()),
        }
    }
}
