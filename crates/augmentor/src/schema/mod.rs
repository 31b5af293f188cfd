//! Column metadata types.

mod column;
mod types;

pub use column::ColumnMetadata;
pub use types::{LogicalType, Provenance, SemanticTag, TableSide};
