//! Raw input handed to a refinery.

use serde_json::Value;
use std::fmt;

/// Input to [`Refinery::refine`](crate::Refinery::refine).
///
/// Plain data is carried as a JSON value: objects are records, arrays are
/// containers. `Lazy` wraps any iterator of records and is always treated as
/// a collection, however deep its elements are.
pub enum Raw {
    Value(Value),
    Lazy(Box<dyn Iterator<Item = Value> + Send>),
}

impl Raw {
    /// Wrap an iterator as a lazily-iterable collection
    pub fn lazy<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Raw::Lazy(Box::new(iter.into_iter()))
    }

    /// Whether dispatch should refine this input element by element.
    ///
    /// Lazy input always is. A plain array only is when it holds at least one
    /// nested container; a flat array is a single item.
    pub fn is_collection(&self) -> bool {
        match self {
            Raw::Lazy(_) => true,
            Raw::Value(value) => is_multidimensional(value),
        }
    }

    /// True for missing data: JSON null
    pub fn is_absent(&self) -> bool {
        matches!(self, Raw::Value(Value::Null))
    }
}

impl From<Value> for Raw {
    fn from(value: Value) -> Self {
        Raw::Value(value)
    }
}

impl From<Vec<Value>> for Raw {
    fn from(values: Vec<Value>) -> Self {
        Raw::Value(Value::Array(values))
    }
}

impl fmt::Debug for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Raw::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Raw::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// An array is multidimensional when its element count differs from its
/// fully recursive element count. Objects and scalars never are.
pub fn is_multidimensional(value: &Value) -> bool {
    match value {
        Value::Array(items) => has_nested(items),
        _ => false,
    }
}

pub(crate) fn has_nested(items: &[Value]) -> bool {
    items.len() != items.iter().map(|v| 1 + count_recursive(v)).sum::<usize>()
}

/// Count every element of a container, descending into nested containers.
fn count_recursive(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.iter().map(|v| 1 + count_recursive(v)).sum(),
        Value::Object(map) => map.values().map(|v| 1 + count_recursive(v)).sum(),
        _ => 0,
    }
}
