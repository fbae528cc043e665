//! Hierarchical modeling of relational datasets.
//!
//! The [`Modeler`] walks the relationship graph children-first. For every
//! parent it fits a model per group of child rows sharing a foreign key,
//! flattens those models' parameters into extension columns, merges them
//! into the parent table and fits the parent on the augmented table
//! (Conditional Parameter Aggregation).

pub mod compact;
pub mod errors;
pub mod extension;
pub mod flatten;
pub mod impute;
pub mod model;
pub mod modeler;

pub use errors::{ModelerError, ModelerResult};
pub use extension::{Extension, extension_column};
pub use flatten::{KEY_SEPARATOR, flatten, flatten_with_prefix, unflatten};
pub use impute::impute_table;
pub use model::{ModelerOptions, ModelingReport, TableReport};
pub use modeler::{ExtendedTables, FittedModels, Modeler};
