//! # Refinery: recursive data reshaping
//!
//! Refinery turns raw records into refined output shapes and merges in
//! refined related data ("attachments"), recursively.
//!
//! ## Features
//!
//! - **Templates**: per-entity shaping logic behind the [`Template`] trait
//! - **Dispatch**: single records, flat lists, nested lists and lazy
//!   iterators are told apart and refined item by item where needed
//! - **Attachments**: named relations refined by dedicated child refineries,
//!   fetched by property access, relation queries or custom extractors
//! - **Filters**: narrow the query that fetches an attachment's data
//! - **Declarative refineries**: YAML definitions and a name-keyed
//!   [`Catalog`] of targets (see [`runtime`])
//!
//! ## Example
//!
//! ```ignore
//! use refinery::{attach, AttachmentMethods, Bring, Refined, Refinery, Target, Template};
//! use serde_json::{json, Value};
//!
//! #[derive(Default)]
//! struct CommentTemplate;
//!
//! impl Template for CommentTemplate {
//!     fn template(&self, raw: &Value) -> Refined {
//!         [("body", Refined::from(raw["body"].clone()))].into_iter().collect()
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
//!         methods.define("comments", || attach(Target::of::<CommentTemplate>()));
//!     }
//! }
//!
//! let posts = Refinery::new(PostTemplate)
//!     .bring(Bring::new().filtered("comments", |q| q.where_eq("approved", true)))?;
//!
//! let refined = posts.refine(json!([
//!     {"title": "Hello", "comments": [{"body": "First", "approved": true}]},
//!     {"title": "Again", "comments": []}
//! ]));
//! ```

// Core modules
pub mod attachment;
pub mod bring;
pub mod error;
pub mod extraction;
pub mod query;
pub mod raw;
pub mod refined;
pub mod refinery;

// Declarative refineries and target catalog
pub mod runtime;

// Re-export key types
pub use attachment::{attach, Attachment, AttachmentMethods, Extractor, Relation, Source, Target};
pub use bring::{Bring, BringEntry};
pub use error::{Error, Result};
pub use extraction::{FieldPath, PathSegment};
pub use query::Query;
pub use raw::Raw;
pub use refined::{merge, Record, Refined};
pub use refinery::{Filter, Refinery, Template};

// Re-export runtime types
pub use runtime::{Catalog, FieldMap, KeyCase, RefineryDef, Shape};
