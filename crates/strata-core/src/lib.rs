//! Core contracts shared by the Strata crates.
//!
//! This crate defines table metadata, the raw and transformed frame
//! representations, the parent/child relationship graph, and the `Dataset`
//! that bundles them for the modeler.

pub mod dataset;
pub mod error;
pub mod frame;
pub mod graph;
pub mod metadata;
pub mod validation;
pub mod value;

pub use dataset::{Dataset, Table};
pub use error::{Error, Result};
pub use frame::Frame;
pub use graph::{GraphReport, RelationshipGraph};
pub use metadata::{FieldMeta, FieldRef, TableMeta};
pub use validation::validate_metadata;
pub use value::Value;

/// Current contract version for `meta.json` bundles.
pub const METADATA_VERSION: &str = "0.1";
