//! Template driven by a [`RefineryDef`].

use crate::attachment::AttachmentMethods;
use crate::error::Error;
use crate::extraction::FieldPath;
use crate::raw::Raw;
use crate::refined::{Record, Refined};
use crate::refinery::Template;
use crate::runtime::catalog::Catalog;
use crate::runtime::definitions::{KeyCase, RefineryDef, Shape};
use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Weak;

/// Projects raw records onto the fields of a definition.
///
/// Attachment targets are looked up by name in the owning catalog when an
/// attachment is brought.
pub struct FieldMap {
    def: RefineryDef,
    paths: Vec<(String, FieldPath)>,
    catalog: Weak<Catalog>,
}

impl FieldMap {
    pub fn new(def: RefineryDef, catalog: Weak<Catalog>) -> Self {
        let paths = def
            .fields
            .iter()
            .map(|(key, path)| (recase(key, def.case), FieldPath::from_dotted(path)))
            .collect();

        Self { def, paths, catalog }
    }

    pub fn definition(&self) -> &RefineryDef {
        &self.def
    }

    fn project(&self, raw: &Value) -> Option<IndexMap<String, Refined>> {
        if self.paths.is_empty() {
            let Value::Object(record) = raw else {
                return None;
            };
            return Some(
                record
                    .iter()
                    .map(|(k, v)| (recase(k, self.def.case), Refined::Value(v.clone())))
                    .collect(),
            );
        }

        Some(
            self.paths
                .iter()
                .map(|(key, path)| {
                    let value = path.resolve(raw).map(Refined::Value).unwrap_or_default();
                    (key.clone(), value)
                })
                .collect(),
        )
    }
}

fn recase(key: &str, case: Option<KeyCase>) -> String {
    match case {
        None => key.to_string(),
        Some(KeyCase::Snake) => key.to_case(Case::Snake),
        Some(KeyCase::Camel) => key.to_case(Case::Camel),
        Some(KeyCase::Pascal) => key.to_case(Case::Pascal),
        Some(KeyCase::Kebab) => key.to_case(Case::Kebab),
    }
}

impl Template for FieldMap {
    fn template(&self, raw: &Value) -> Refined {
        // Non-record input without declared fields is passed through as is
        let Some(fields) = self.project(raw) else {
            return Refined::Value(raw.clone());
        };

        match self.def.shape {
            Shape::Map => Refined::Map(fields),
            Shape::Record => {
                let mut record = Record::new(&self.def.name);
                for (key, value) in fields {
                    record.set(key, value);
                }
                Refined::Record(record)
            }
        }
    }

    fn attachments(&self, methods: &mut AttachmentMethods) {
        for (name, attachment) in &self.def.attachments {
            let catalog = self.catalog.clone();
            let target = attachment.target.clone();
            let path = attachment.path.as_deref().map(FieldPath::from_dotted);

            methods.define(name.clone(), move || {
                let catalog = catalog
                    .upgrade()
                    .ok_or_else(|| Error::target_not_found(&target))?;
                let attachment = catalog.attach(&target)?;

                Ok(match path.clone() {
                    Some(path) => attachment.with_extractor(move |raw| path.resolve(raw).map(Raw::Value)),
                    None => attachment,
                })
            });
        }
    }

    fn name(&self) -> &str {
        &self.def.name
    }
}
