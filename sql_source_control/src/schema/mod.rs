//! Schema module for sql_source_control
//!
//! This module holds the catalog metadata model, constraint grouping, and
//! script generation.

pub mod generator;
pub mod grouping;
pub mod types;

// Re-export key types
pub use generator::ScriptGenerator;
pub use grouping::{group_constraints, ConstraintGroup};
pub use types::{
    Catalog, Column, DataValue, ForeignKeyColumn, IndexColumn, KeyColumn, ObjectKind,
    ObjectRows, SchemaObject, TableData,
};
