//! Relation queries.
//!
//! A [`Query`] is a pending selection over the records related to a raw item.
//! Filters receive the query before it runs and narrow it; `fetch` then
//! materializes the selection as raw input for the attached refinery.

use crate::raw::Raw;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum Rows {
    None,
    One(Value),
    Many(Vec<Value>),
}

#[derive(Clone)]
struct Sort {
    field: String,
    descending: bool,
}

/// Pending selection over related records.
#[derive(Clone)]
pub struct Query {
    rows: Rows,
    predicates: Vec<Predicate>,
    sort: Option<Sort>,
    skip: usize,
    limit: Option<usize>,
}

impl Query {
    fn with_rows(rows: Rows) -> Self {
        Self {
            rows,
            predicates: Vec::new(),
            sort: None,
            skip: 0,
            limit: None,
        }
    }

    /// Query that yields nothing
    pub fn empty() -> Self {
        Self::with_rows(Rows::None)
    }

    /// Query over a single related record
    pub fn one(record: Value) -> Self {
        Self::with_rows(Rows::One(record))
    }

    /// Query over many related records
    pub fn many(records: impl IntoIterator<Item = Value>) -> Self {
        Self::with_rows(Rows::Many(records.into_iter().collect()))
    }

    /// Interpret plain data as a relation: arrays are to-many, null is
    /// nothing, anything else is to-one.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            Value::Array(items) => Self::many(items),
            other => Self::one(other),
        }
    }

    /// Like [`Query::from_value`], draining lazy input into a to-many query
    pub fn from_raw(raw: Raw) -> Self {
        match raw {
            Raw::Value(value) => Self::from_value(value),
            Raw::Lazy(iter) => Self::many(iter),
        }
    }

    /// Keep records whose `field` equals `value`
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        self.where_fn(move |record| record.get(&field) == Some(&value))
    }

    /// Keep records matching an arbitrary predicate
    pub fn where_fn<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            descending: true,
        });
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn matches(&self, record: &Value) -> bool {
        self.predicates.iter().all(|p| p(record))
    }

    /// Run the query.
    ///
    /// A to-one query yields its record when it passes every predicate. A
    /// to-many query always yields a lazy collection, possibly empty. An
    /// empty query yields nothing.
    pub fn fetch(self) -> Option<Raw> {
        match &self.rows {
            Rows::None => None,
            Rows::One(record) => {
                if self.matches(record) && self.skip == 0 && self.limit != Some(0) {
                    Some(Raw::Value(record.clone()))
                } else {
                    None
                }
            }
            Rows::Many(records) => {
                let mut selected: Vec<Value> = records
                    .iter()
                    .filter(|r| self.matches(r))
                    .cloned()
                    .collect();

                if let Some(sort) = &self.sort {
                    selected.sort_by(|a, b| {
                        let ord = compare_values(a.get(&sort.field), b.get(&sort.field));
                        if sort.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    });
                }

                let limit = self.limit.unwrap_or(usize::MAX);
                let selected: Vec<Value> =
                    selected.into_iter().skip(self.skip).take(limit).collect();
                Some(Raw::lazy(selected))
            }
        }
    }
}

/// Order missing < null < bool < number < string; arrays and objects sort
/// after strings and compare equal among themselves.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = match &self.rows {
            Rows::None => "none".to_string(),
            Rows::One(_) => "one".to_string(),
            Rows::Many(r) => format!("many({})", r.len()),
        };
        f.debug_struct("Query")
            .field("rows", &rows)
            .field("predicates", &self.predicates.len())
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(raw: Option<Raw>) -> Vec<Value> {
        match raw {
            Some(Raw::Lazy(iter)) => iter.collect(),
            other => panic!("expected lazy collection, got {:?}", other),
        }
    }

    fn comments() -> Query {
        Query::from_value(json!([
            {"id": 1, "approved": true, "score": 5},
            {"id": 2, "approved": false, "score": 9},
            {"id": 3, "approved": true, "score": 7}
        ]))
    }

    #[test]
    fn test_where_eq() {
        let rows = collect(comments().where_eq("approved", true).fetch());
        let ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_order_skip_limit() {
        let rows = collect(comments().order_by_desc("score").skip(1).limit(1).fetch());
        assert_eq!(rows, vec![json!({"id": 3, "approved": true, "score": 7})]);

        let rows = collect(comments().order_by("score").fetch());
        let ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_to_many_with_no_matches_is_empty_collection() {
        let rows = collect(comments().where_eq("id", 42).fetch());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_to_one() {
        let query = Query::from_value(json!({"id": 1, "active": true}));
        assert!(matches!(query.clone().fetch(), Some(Raw::Value(_))));
        assert!(query.where_eq("active", false).fetch().is_none());
    }

    #[test]
    fn test_null_is_empty() {
        assert!(Query::from_value(Value::Null).fetch().is_none());
    }

    #[test]
    fn test_compare_values_ranks_types() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("a"))), Ordering::Less);
    }
}
