//! Schema model (component A) and Inspector (component B): a typed,
//! dialect-independent in-memory representation of a database's catalog,
//! and the per-dialect code that reads a live catalog into it.

mod describer;
mod ids;
mod model;
mod normalize;
mod walkers;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use describer::{InspectOptions, ObjectKind, ObjectKinds, SchemaDescriber};
pub use ids::{CheckId, ColumnId, EnumId, ForeignKeyId, IndexId, SchemaId, SequenceId, TableId};
pub use model::*;
pub use normalize::*;
pub use walkers::{
    CheckWalker, ColumnWalker, EnumWalker, ForeignKeyWalker, IndexWalker, SequenceWalker, SqlSchemaExt, TableWalker,
    Walker,
};
