//! Refinery definitions and loader.
//!
//! Loads declarative refinery definitions from YAML. A definition describes
//! the output fields of a template and the attachments it may bring, with
//! attachment targets named by the catalog they are registered in.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Declarative refinery definition.
///
/// # Example
///
/// ```yaml
/// definitions:
///   - name: Post
///     case: camel
///     fields:
///       post_title: title
///       author_name: meta.author.name
///     attachments:
///       comments:
///         target: Comment
///       author:
///         target: User
///         path: meta.author
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineryDef {
    /// Definition name, also the catalog key and record name
    pub name: String,

    /// Output key -> dotted source path. Empty passes the record through.
    #[serde(default)]
    pub fields: IndexMap<String, String>,

    /// Case applied to output keys
    #[serde(default)]
    pub case: Option<KeyCase>,

    /// Map or record output
    #[serde(default)]
    pub shape: Shape,

    /// Attachment name -> attachment definition
    #[serde(default)]
    pub attachments: IndexMap<String, AttachmentDef>,
}

/// Attachment declared by a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDef {
    /// Catalog name of the target refinery
    pub target: String,

    /// Dotted path to extract the attachment's data from. Without one the
    /// attachment name is read off the raw record.
    #[serde(default)]
    pub path: Option<String>,
}

/// Case conversion for output keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCase {
    Snake,
    Camel,
    Pascal,
    Kebab,
}

/// Output shape of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Map,
    Record,
}

impl RefineryDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            case: None,
            shape: Shape::Map,
            attachments: IndexMap::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.fields.insert(key.into(), path.into());
        self
    }

    pub fn attachment(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.attachments.insert(
            name.into(),
            AttachmentDef {
                target: target.into(),
                path: None,
            },
        );
        self
    }

    pub fn attachment_at(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.attachments.insert(
            name.into(),
            AttachmentDef {
                target: target.into(),
                path: Some(path.into()),
            },
        );
        self
    }

    pub fn case(mut self, case: KeyCase) -> Self {
        self.case = Some(case);
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Check a single definition for structural problems
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Refinery definition has an empty name"));
        }

        for (key, path) in &self.fields {
            if key.trim().is_empty() {
                return Err(Error::config(format!(
                    "Definition '{}' has a field with an empty key",
                    self.name
                )));
            }
            if path.trim().is_empty() {
                return Err(Error::config(format!(
                    "Definition '{}' field '{}' has an empty path",
                    self.name, key
                )));
            }
        }

        for (name, attachment) in &self.attachments {
            if attachment.target.trim().is_empty() {
                return Err(Error::config(format!(
                    "Definition '{}' attachment '{}' has no target",
                    self.name, name
                )));
            }
        }

        Ok(())
    }
}

/// Validate a set of definitions, including name uniqueness
pub fn validate_definitions(defs: &[RefineryDef]) -> Result<()> {
    let mut seen = HashSet::new();
    for def in defs {
        def.validate()?;
        if !seen.insert(def.name.as_str()) {
            return Err(Error::config(format!(
                "Duplicate refinery definition '{}'",
                def.name
            )));
        }
    }
    Ok(())
}

/// Parse definitions from a YAML document with a top-level `definitions` list.
pub fn load_definitions_from_str(yaml: &str) -> Result<Vec<RefineryDef>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;

    let defs_yaml = doc
        .get("definitions")
        .ok_or_else(|| Error::config("Config missing 'definitions' field"))?;

    let defs: Vec<RefineryDef> = serde_yaml::from_value(defs_yaml.clone())?;
    validate_definitions(&defs)?;

    tracing::info!("Loaded {} refinery definitions", defs.len());
    Ok(defs)
}

/// Load definitions from a YAML file.
pub fn load_definitions_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<RefineryDef>> {
    let contents = fs::read_to_string(path)?;
    load_definitions_from_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &str = r#"
definitions:
  - name: Post
    case: camel
    shape: record
    fields:
      post_title: title
      author_name: meta.author.name
    attachments:
      comments:
        target: Comment
      author:
        target: User
        path: meta.author
  - name: Comment
"#;

    #[test]
    fn test_load_definitions() {
        let defs = load_definitions_from_str(DEFS).unwrap();
        assert_eq!(defs.len(), 2);

        let post = &defs[0];
        assert_eq!(post.name, "Post");
        assert_eq!(post.case, Some(KeyCase::Camel));
        assert_eq!(post.shape, Shape::Record);
        assert_eq!(
            post.fields.keys().collect::<Vec<_>>(),
            vec!["post_title", "author_name"]
        );
        assert_eq!(post.attachments["author"].path.as_deref(), Some("meta.author"));
        assert_eq!(post.attachments["comments"].path, None);

        let comment = &defs[1];
        assert!(comment.fields.is_empty());
        assert_eq!(comment.shape, Shape::Map);
    }

    #[test]
    fn test_missing_definitions_key() {
        let err = load_definitions_from_str("entities: []").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        let err = load_definitions_from_str(
            r#"
definitions:
  - name: User
  - name: User
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate refinery definition 'User'"));
    }

    #[test]
    fn test_validate_empty_target() {
        let def = RefineryDef::new("Post").attachment("author", " ");
        assert!(def.validate().is_err());

        let def = RefineryDef::new("Post").field("title", "");
        assert!(def.validate().is_err());

        let def = RefineryDef::new("Post").field("title", "title").attachment("author", "User");
        assert!(def.validate().is_ok());
    }
}
