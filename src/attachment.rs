//! Attachments: named relations refined by a dedicated child refinery.
//!
//! A template declares zero-argument attachment methods into an
//! [`AttachmentMethods`] table. Calling one yields an [`Attachment`] built by
//! [`attach`], which constructs a fresh target refinery from a [`Target`]
//! factory. Which data gets refined is decided by the attachment's
//! [`Source`].

use crate::error::{Error, Result};
use crate::query::Query;
use crate::raw::Raw;
use crate::refinery::{Refinery, Template};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// Callback replacing plain attribute access
pub type Extractor = Arc<dyn Fn(&Value) -> Option<Raw> + Send + Sync>;

/// Zero-argument relation bound to a raw item
pub type Relation = Arc<dyn Fn(&Value) -> Query + Send + Sync>;

type Factory = Arc<dyn Fn() -> Result<Refinery> + Send + Sync>;

type Method = Arc<dyn Fn() -> Result<Attachment> + Send + Sync>;

/// Where an attachment's raw data comes from
#[derive(Clone)]
pub enum Source {
    /// Read the attachment's name off the raw item
    Property,
    /// Call a relation and run the resulting query
    Relation(Relation),
    /// Hand the raw item to a custom callback
    Extractor(Extractor),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Property => write!(f, "Property"),
            Source::Relation(_) => write!(f, "Relation"),
            Source::Extractor(_) => write!(f, "Extractor"),
        }
    }
}

/// A resolved attachment: the target refinery plus how to fetch its data.
pub struct Attachment {
    target: Refinery,
    source: Source,
}

impl Attachment {
    /// Fetch data through a custom callback instead of property access
    pub fn with_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&Value) -> Option<Raw> + Send + Sync + 'static,
    {
        self.source = Source::Extractor(Arc::new(extractor));
        self
    }

    /// Fetch data by running a relation query
    pub fn with_relation<F>(mut self, relation: F) -> Self
    where
        F: Fn(&Value) -> Query + Send + Sync + 'static,
    {
        self.source = Source::Relation(Arc::new(relation));
        self
    }

    pub fn target(&self) -> &Refinery {
        &self.target
    }

    pub(crate) fn target_mut(&mut self) -> &mut Refinery {
        &mut self.target
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Fetch the raw data this attachment refines from `raw`.
    ///
    /// When the target carries a filter, the data is always fetched through
    /// a query so the filter can narrow it before it runs.
    pub(crate) fn fetch(&self, name: &str, raw: &Value) -> Option<Raw> {
        let filter = self.target.get_filter();

        let data = match (&self.source, filter) {
            (Source::Property, None) => raw.get(name).cloned().map(Raw::Value),
            (Source::Property, Some(filter)) => {
                let relation = Query::from_value(raw.get(name).cloned().unwrap_or(Value::Null));
                filter(relation).fetch()
            }
            (Source::Relation(relation), filter) => {
                let query = relation(raw);
                match filter {
                    Some(filter) => filter(query).fetch(),
                    None => query.fetch(),
                }
            }
            (Source::Extractor(extract), None) => extract(raw),
            (Source::Extractor(extract), Some(filter)) => {
                extract(raw).and_then(|data| filter(Query::from_raw(data)).fetch())
            }
        };

        data.filter(|d| !d.is_absent())
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("target", &self.target.name())
            .field("source", &self.source)
            .finish()
    }
}

/// Constructible attachment target.
///
/// Every [`Target::build`] runs the factory again, so no two attachments
/// ever share a refinery instance. Targets are told apart by `key`; `name`
/// is only for display.
#[derive(Clone)]
pub struct Target {
    key: String,
    name: String,
    factory: Factory,
}

impl Target {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Refinery> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            factory: Arc::new(factory),
        }
    }

    /// Target built from a default-constructed template type, keyed by the
    /// template's full type path
    pub fn of<T>() -> Self
    where
        T: Template + Default + 'static,
    {
        Self {
            key: std::any::type_name::<T>().to_string(),
            name: short_type_name::<T>().to_string(),
            factory: Arc::new(|| Ok(Refinery::new(T::default()))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity used to detect construction cycles
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Construct a fresh refinery.
    ///
    /// Fails with [`Error::AttachmentCycle`] when this target's factory is
    /// already running further up the stack.
    pub fn build(&self) -> Result<Refinery> {
        let _guard = ConstructionGuard::enter(&self.key, &self.name)?;
        (self.factory)()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}

thread_local! {
    /// (key, name) of every target factory running on this thread
    static CONSTRUCTING: RefCell<Vec<(String, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a target factory as running on this thread until dropped.
struct ConstructionGuard;

impl ConstructionGuard {
    fn enter(key: &str, name: &str) -> Result<Self> {
        CONSTRUCTING.with(|chain| {
            let mut chain = chain.borrow_mut();
            if chain.iter().any(|(k, _)| k == key) {
                let mut cycle: Vec<String> = chain.iter().map(|(_, n)| n.clone()).collect();
                cycle.push(name.to_string());
                return Err(Error::AttachmentCycle { chain: cycle });
            }
            chain.push((key.to_string(), name.to_string()));
            Ok(ConstructionGuard)
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|chain| {
            chain.borrow_mut().pop();
        });
    }
}

/// Build an attachment to a freshly constructed target, fetched by property
/// access until an extractor or relation is set.
pub fn attach(target: Target) -> Result<Attachment> {
    let refinery = target.build()?;
    tracing::trace!("Constructed attachment target {}", target.name());
    Ok(Attachment {
        target: refinery,
        source: Source::Property,
    })
}

/// Attachment methods a template declares, keyed by attachment name.
#[derive(Clone, Default)]
pub struct AttachmentMethods {
    methods: IndexMap<String, Method>,
}

impl AttachmentMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attachment method. Redefining a name replaces it.
    pub fn define<F>(&mut self, name: impl Into<String>, method: F) -> &mut Self
    where
        F: Fn() -> Result<Attachment> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Invoke the method declared under `name`, or `None` if there is none
    pub(crate) fn call(&self, name: &str) -> Option<Result<Attachment>> {
        self.methods.get(name).map(|method| method())
    }
}

impl fmt::Debug for AttachmentMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.keys()).finish()
    }
}

/// Last path segment of a type name, generics included
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
