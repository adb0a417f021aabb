//! Bring plans: which attachments a refinery should resolve.
//!
//! A plan is an ordered list of attachment names. Each name may carry a
//! nested plan, forwarded to the attachment's own refinery, or a filter,
//! installed on the attachment's refinery.
//!
//! Plans are usually written in code:
//!
//! ```ignore
//! use refinery::Bring;
//!
//! let plan = Bring::new()
//!     .with("author")
//!     .nested("comments", ["author"])
//!     .filtered("tags", |q| q.where_eq("visible", true));
//! ```
//!
//! Plans without filters can also be loaded from YAML:
//!
//! ```yaml
//! - author
//! - comments: [author]
//! ```

use crate::error::Result;
use crate::query::Query;
use crate::refinery::Filter;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// What to do with one brought attachment
#[derive(Clone)]
pub enum BringEntry {
    /// Attach it as declared
    Plain,
    /// Attach it, then bring this plan on its refinery
    Nested(Bring),
    /// Attach it, then install this filter on its refinery
    Filter(Filter),
}

/// Ordered set of attachments to resolve
#[derive(Clone, Default, Deserialize)]
#[serde(from = "PlanDoc")]
pub struct Bring {
    entries: Vec<(String, BringEntry)>,
}

impl Bring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), BringEntry::Plain));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, plan: impl Into<Bring>) -> Self {
        self.entries.push((name.into(), BringEntry::Nested(plan.into())));
        self
    }

    pub fn filtered<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(Query) -> Query + Send + Sync + 'static,
    {
        self.entries
            .push((name.into(), BringEntry::Filter(Arc::new(filter))));
        self
    }

    /// Append every entry of `other`
    pub fn extend(mut self, other: impl Into<Bring>) -> Self {
        self.entries.extend(other.into().entries);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn entries(&self) -> &[(String, BringEntry)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, BringEntry)> {
        self.entries
    }

    /// Parse a plan from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a plan from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

/// Document forms a plan may be written in
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanDoc {
    Name(String),
    List(Vec<PlanDoc>),
    Map(IndexMap<String, Option<PlanDoc>>),
}

impl From<PlanDoc> for Bring {
    fn from(doc: PlanDoc) -> Self {
        match doc {
            PlanDoc::Name(name) => Bring::new().with(name),
            PlanDoc::List(items) => items
                .into_iter()
                .fold(Bring::new(), |plan, item| plan.extend(Bring::from(item))),
            PlanDoc::Map(map) => map.into_iter().fold(Bring::new(), |plan, (name, nested)| {
                match nested {
                    Some(nested) => plan.nested(name, Bring::from(nested)),
                    None => plan.with(name),
                }
            }),
        }
    }
}

impl From<&str> for Bring {
    fn from(name: &str) -> Self {
        Bring::new().with(name)
    }
}

impl From<String> for Bring {
    fn from(name: String) -> Self {
        Bring::new().with(name)
    }
}

impl<const N: usize> From<[&str; N]> for Bring {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().fold(Bring::new(), Bring::with)
    }
}

impl From<&[&str]> for Bring {
    fn from(names: &[&str]) -> Self {
        names.iter().copied().fold(Bring::new(), Bring::with)
    }
}

impl From<Vec<&str>> for Bring {
    fn from(names: Vec<&str>) -> Self {
        names.into_iter().fold(Bring::new(), Bring::with)
    }
}

impl From<Vec<String>> for Bring {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().fold(Bring::new(), Bring::with)
    }
}

impl fmt::Debug for Bring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.entries {
            match entry {
                BringEntry::Plain => map.entry(name, &"plain"),
                BringEntry::Nested(plan) => map.entry(name, plan),
                BringEntry::Filter(_) => map.entry(name, &"filter"),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn names(plan: &Bring) -> Vec<&str> {
        plan.names().collect()
    }

    #[test]
    fn test_single_and_array_forms_match() {
        assert_eq!(names(&Bring::from("author")), names(&Bring::from(["author"])));
        assert_eq!(
            names(&Bring::from(vec!["author", "comments"])),
            names(&Bring::new().with("author").with("comments"))
        );
    }

    #[test]
    fn test_entry_kinds() {
        let plan = Bring::new()
            .with("author")
            .nested("comments", ["author"])
            .filtered("tags", |q| q.limit(2));

        let entries = plan.entries();
        assert!(matches!(entries[0].1, BringEntry::Plain));
        assert!(matches!(&entries[1].1, BringEntry::Nested(p) if p.len() == 1));
        assert!(matches!(entries[2].1, BringEntry::Filter(_)));
    }

    #[test]
    fn test_plan_from_yaml_list() {
        let plan = Bring::from_yaml_str(
            r#"
- author
- comments: [author, likes]
- tags
"#,
        )
        .unwrap();

        assert_eq!(names(&plan), vec!["author", "comments", "tags"]);
        match &plan.entries()[1].1 {
            BringEntry::Nested(nested) => assert_eq!(names(nested), vec!["author", "likes"]),
            _ => panic!("expected nested plan"),
        }
    }

    #[test]
    fn test_plan_from_yaml_map() {
        let plan = Bring::from_yaml_str(
            r#"
author:
comments:
  author:
    profile:
"#,
        )
        .unwrap();

        assert_eq!(names(&plan), vec!["author", "comments"]);
        assert!(matches!(plan.entries()[0].1, BringEntry::Plain));
        match &plan.entries()[1].1 {
            BringEntry::Nested(nested) => {
                assert_eq!(names(nested), vec!["author"]);
                assert!(matches!(&nested.entries()[0].1, BringEntry::Nested(p) if p.len() == 1));
            }
            _ => panic!("expected nested plan"),
        }
    }

    #[test]
    fn test_plan_from_yaml_single_name() {
        let plan = Bring::from_yaml_str("author").unwrap();
        assert_eq!(names(&plan), vec!["author"]);
    }

    #[test]
    fn test_invalid_plan() {
        assert!(matches!(Bring::from_yaml_str("- true"), Err(Error::Yaml(_))));
    }
}
