//! Path-based field extraction from raw records.
//!
//! Declarative refineries address raw data with dotted paths such as
//! `author.profile.name`, `tags.[0]` or `comments.*.id`.

use serde_json::Value;
use std::fmt;

/// Represents a path to a field in a raw record
///
/// # Examples
///
/// - `user.name` - nested field
/// - `items.[0].name` - array index
/// - `items.*.name` - every element of an array (or value of an object)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field (e.g., "user", "name")
    Field(String),
    /// An array index (e.g., [0], [5])
    Index(usize),
    /// Every element at this level ("*" or "**")
    Wildcard,
}

impl FieldPath {
    /// Parse a field path with a given delimiter
    pub fn parse(path: &str, delimiter: &str) -> Self {
        let segments = path
            .split(delimiter)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('[') && s.ends_with(']') {
                    if let Ok(index) = s[1..s.len() - 1].parse::<usize>() {
                        return PathSegment::Index(index);
                    }
                }

                if s == "*" || s == "**" {
                    return PathSegment::Wildcard;
                }

                PathSegment::Field(s.to_string())
            })
            .collect();

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// Create a field path from a dotted string
    pub fn from_dotted(path: &str) -> Self {
        Self::parse(path, ".")
    }

    /// Resolve this path against a record.
    ///
    /// Returns `None` when any segment is missing. A wildcard maps the rest
    /// of the path over every element and collects the results that exist.
    pub fn resolve(&self, value: &Value) -> Option<Value> {
        resolve_segments(&self.segments, value)
    }
}

fn resolve_segments(segments: &[PathSegment], value: &Value) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match head {
        PathSegment::Field(name) => resolve_segments(rest, value.get(name.as_str())?),
        PathSegment::Index(index) => resolve_segments(rest, value.get(*index)?),
        PathSegment::Wildcard => {
            let children: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(map) => map.values().collect(),
                _ => return None,
            };
            Some(Value::Array(
                children
                    .into_iter()
                    .filter_map(|child| resolve_segments(rest, child))
                    .collect(),
            ))
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
