//! Name-keyed registry of attachment targets.
//!
//! The catalog resolves textual target identifiers to constructible
//! refineries. It backs declarative definitions, whose attachments name
//! their targets, and lets code look refineries up by name.

use crate::attachment::{attach, Attachment, Target};
use crate::error::{Error, Result};
use crate::refinery::{Refinery, Template};
use crate::runtime::definitions::{
    load_definitions_from_file, load_definitions_from_str, validate_definitions, RefineryDef,
};
use crate::runtime::field_map::FieldMap;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// Registry of targets keyed by name
#[derive(Debug, Default)]
pub struct Catalog {
    targets: IndexMap<String, Target>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target under its own name, replacing any previous one
    pub fn register(&mut self, target: Target) -> &mut Self {
        tracing::debug!("Registered refinery target {}", target.name());
        self.targets.insert(target.name().to_string(), target);
        self
    }

    /// Register a default-constructed template type under `name`
    pub fn register_template<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: Template + Default + 'static,
    {
        self.register(Target::new(name, || Ok(Refinery::new(T::default()))))
    }

    /// Check if a target is registered
    pub fn has_target(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Registered target names, in registration order
    pub fn list_targets(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Attach a fresh instance of the target registered under `name`
    pub fn attach(&self, name: &str) -> Result<Attachment> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| Error::target_not_found(name))?;
        attach(target.clone())
    }

    /// Build a fresh root refinery for the target registered under `name`
    pub fn refinery(&self, name: &str) -> Result<Refinery> {
        self.targets
            .get(name)
            .ok_or_else(|| Error::target_not_found(name))?
            .build()
    }

    /// Seal this catalog together with declarative definitions.
    ///
    /// Each definition becomes a target named after it. Definitions resolve
    /// their attachment targets through the returned catalog, so they may
    /// refer to each other and to any target registered beforehand.
    pub fn with_definitions(self, defs: Vec<RefineryDef>) -> Result<Arc<Catalog>> {
        validate_definitions(&defs)?;
        if let Some(def) = defs.iter().find(|def| self.has_target(&def.name)) {
            return Err(Error::config(format!(
                "Definition '{}' conflicts with a registered target",
                def.name
            )));
        }

        Ok(Arc::new_cyclic(|catalog| {
            let mut sealed = self;
            for def in defs {
                let name = def.name.clone();
                let template: Arc<dyn Template> = Arc::new(FieldMap::new(def, catalog.clone()));
                sealed.register(Target::new(name, move || {
                    Ok(Refinery::from_template(template.clone()))
                }));
            }
            sealed
        }))
    }

    /// Build a catalog from a definitions YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Arc<Catalog>> {
        Catalog::new().with_definitions(load_definitions_from_str(yaml)?)
    }

    /// Build a catalog from a definitions YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Arc<Catalog>> {
        Catalog::new().with_definitions(load_definitions_from_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refined::Refined;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Upper;

    impl Template for Upper {
        fn template(&self, raw: &Value) -> Refined {
            Refined::from(raw.as_str().unwrap_or_default().to_uppercase())
        }
    }

    #[test]
    fn test_register_and_build() {
        let mut catalog = Catalog::new();
        catalog.register_template::<Upper>("upper");

        assert!(catalog.has_target("upper"));
        assert!(!catalog.has_target("lower"));
        assert_eq!(catalog.count(), 1);

        let refinery = catalog.refinery("upper").unwrap();
        assert_eq!(refinery.refine(json!("hello")), Refined::from("HELLO"));
    }

    #[test]
    fn test_target_not_found() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.attach("nonexistent"),
            Err(Error::AttachmentTargetNotFound { target }) if target == "nonexistent"
        ));
        assert!(matches!(
            catalog.refinery("nonexistent"),
            Err(Error::AttachmentTargetNotFound { .. })
        ));
    }

    #[test]
    fn test_list_targets_in_registration_order() {
        let mut catalog = Catalog::new();
        catalog
            .register(Target::of::<Upper>())
            .register_template::<Upper>("shout");
        assert_eq!(catalog.list_targets(), vec!["Upper", "shout"]);
    }

    #[test]
    fn test_definition_conflicting_with_target() {
        let mut catalog = Catalog::new();
        catalog.register_template::<Upper>("User");

        let err = catalog
            .with_definitions(vec![RefineryDef::new("User")])
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_definitions_see_registered_targets() {
        let mut catalog = Catalog::new();
        catalog.register_template::<Upper>("Shout");

        let catalog = catalog
            .with_definitions(vec![RefineryDef::new("Post")
                .field("title", "title")
                .attachment_at("loud", "Shout", "title")])
            .unwrap();

        let refinery = catalog.refinery("Post").unwrap().bring("loud").unwrap();
        let refined = refinery.refine(json!({"title": "hello"}));
        assert_eq!(refined.to_json(), json!({"title": "hello", "loud": "HELLO"}));
    }
}
