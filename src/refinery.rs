//! The refinery: dispatch, attachment resolution and merge.
//!
//! A [`Refinery`] wraps a [`Template`] with configuration. Configuration
//! (`bring`, `filter`) and execution (`refine`) are separate phases: every
//! attachment is resolved while bringing, so a configured refinery never
//! fails while refining.
//!
//! # Example
//!
//! ```ignore
//! use refinery::{attach, AttachmentMethods, Refined, Refinery, Target, Template};
//! use serde_json::{json, Value};
//!
//! #[derive(Default)]
//! struct UserTemplate;
//!
//! impl Template for UserTemplate {
//!     fn template(&self, raw: &Value) -> Refined {
//!         [("name", Refined::from(raw["name"].clone()))].into_iter().collect()
//!     }
//! }
//!
//! struct PostTemplate;
//!
//! impl Template for PostTemplate {
//!     fn template(&self, raw: &Value) -> Refined {
//!         [("title", Refined::from(raw["title"].clone()))].into_iter().collect()
//!     }
//!
//!     fn attachments(&self, methods: &mut AttachmentMethods) {
//!         methods.define("author", || attach(Target::of::<UserTemplate>()));
//!     }
//! }
//!
//! let posts = Refinery::new(PostTemplate).bring("author")?;
//! let refined = posts.refine(json!({"title": "Hello", "author": {"name": "Ada"}}));
//! ```

use crate::attachment::{short_type_name, Attachment, AttachmentMethods};
use crate::bring::{Bring, BringEntry};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::raw::{has_nested, Raw};
use crate::refined::{merge, Refined};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback narrowing the query that fetches an attachment's data
pub type Filter = Arc<dyn Fn(Query) -> Query + Send + Sync>;

/// Per-entity shaping logic.
///
/// `template` turns one raw item into its base refined shape. Templates that
/// have attachments declare them in `attachments`; the table is collected once
/// when the refinery is constructed.
pub trait Template: Send + Sync {
    /// Produce the base refined shape of a single raw item
    fn template(&self, raw: &Value) -> Refined;

    /// Declare the attachment methods this template supports
    fn attachments(&self, _methods: &mut AttachmentMethods) {}

    /// Name used in errors and logs
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// A configured template.
pub struct Refinery {
    name: String,
    template: Arc<dyn Template>,
    methods: AttachmentMethods,
    attachments: IndexMap<String, Attachment>,
    filter: Option<Filter>,
}

impl Refinery {
    pub fn new<T: Template + 'static>(template: T) -> Self {
        Self::from_template(Arc::new(template))
    }

    /// Build a refinery around a shared template
    pub fn from_template(template: Arc<dyn Template>) -> Self {
        let mut methods = AttachmentMethods::new();
        template.attachments(&mut methods);

        Self {
            name: template.name().to_string(),
            template,
            methods,
            attachments: IndexMap::new(),
            filter: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Refine raw input.
    ///
    /// Lazy input and arrays holding nested containers are refined element
    /// by element into a [`Refined::Seq`]. Anything else, including a flat
    /// array, is a single item.
    pub fn refine(&self, raw: impl Into<Raw>) -> Refined {
        match raw.into() {
            Raw::Lazy(items) => self.refine_collection(items),
            Raw::Value(Value::Array(items)) if has_nested(&items) => {
                self.refine_collection(items)
            }
            Raw::Value(item) => self.refine_item(&item),
        }
    }

    /// Refine one raw item and merge in its attachments
    pub fn refine_item(&self, raw: &Value) -> Refined {
        let base = self.template.template(raw);

        if self.attachments.is_empty() {
            return base;
        }

        merge(base, self.include_attachments(raw))
    }

    /// Refine every element in order. The whole output is built before
    /// returning.
    pub fn refine_collection<I>(&self, items: I) -> Refined
    where
        I: IntoIterator<Item = Value>,
    {
        let refined: Vec<Refined> = items
            .into_iter()
            .map(|item| self.refine_item(&item))
            .collect();
        tracing::trace!("{} refined a collection of {}", self.name, refined.len());
        Refined::Seq(refined)
    }

    /// Refine every brought attachment of `raw`.
    ///
    /// Returns a map with one entry per attachment, in bring order. Missing
    /// data yields `Refined::Null` without running the attachment's refinery.
    pub fn include_attachments(&self, raw: &Value) -> Refined {
        let mut results = IndexMap::with_capacity(self.attachments.len());

        for (name, attachment) in &self.attachments {
            let refined = match attachment.fetch(name, raw) {
                Some(data) => attachment.target().refine(data),
                None => Refined::Null,
            };
            results.insert(name.clone(), refined);
        }

        Refined::Map(results)
    }

    /// Resolve attachments, consuming and returning the refinery.
    ///
    /// Accepts a single name, an array or vec of names, or a [`Bring`] plan
    /// with nested plans and filters.
    pub fn bring(mut self, plan: impl Into<Bring>) -> Result<Self> {
        self.bring_mut(plan)?;
        Ok(self)
    }

    /// In-place form of [`Refinery::bring`].
    ///
    /// Brought attachments accumulate across calls; bringing a name again
    /// replaces its attachment with a freshly constructed one.
    pub fn bring_mut(&mut self, plan: impl Into<Bring>) -> Result<&mut Self> {
        for (name, entry) in plan.into().into_entries() {
            let mut attachment = self.attach_item(&name)?;

            match entry {
                BringEntry::Plain => {}
                BringEntry::Nested(nested) => {
                    attachment.target_mut().bring_mut(nested)?;
                }
                BringEntry::Filter(filter) => {
                    attachment.target_mut().filter = Some(filter);
                }
            }

            tracing::debug!(
                "{} brought '{}' ({}, {:?})",
                self.name,
                name,
                attachment.target().name(),
                attachment.source()
            );
            self.attachments.insert(name, attachment);
        }

        Ok(self)
    }

    /// Call the attachment method declared under `name`
    pub fn attach_item(&self, name: &str) -> Result<Attachment> {
        self.methods
            .call(name)
            .unwrap_or_else(|| Err(Error::method_not_found(&self.name, name)))
    }

    /// Names of the brought attachments, in bring order
    pub fn attachments(&self) -> impl Iterator<Item = &str> {
        self.attachments.keys().map(|k| k.as_str())
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.get(name)
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Attachment methods the template declared
    pub fn methods(&self) -> &AttachmentMethods {
        &self.methods
    }

    pub fn set_filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(Query) -> Query + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Chainable form of [`Refinery::set_filter`]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Query) -> Query + Send + Sync + 'static,
    {
        self.set_filter(filter);
        self
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn get_filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

impl fmt::Debug for Refinery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinery")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("attachments", &self.attachments)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
