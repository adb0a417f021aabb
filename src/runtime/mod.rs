//! Declarative refineries.
//!
//! Builds refineries from YAML definitions instead of hand-written
//! templates, and resolves attachment targets by name through a catalog.

pub mod catalog;
pub mod definitions;
pub mod field_map;

// Re-export key types
pub use catalog::Catalog;
pub use definitions::{
    load_definitions_from_file, load_definitions_from_str, AttachmentDef, KeyCase, RefineryDef,
    Shape,
};
pub use field_map::FieldMap;
