//! Database module for sql_source_control
//!
//! The seams between the scripting engine and a live database: reading the
//! catalog and executing batches.

pub mod catalog;
pub mod executor;

// Re-export key types
pub use catalog::{CatalogReader, SnapshotCatalog};
pub use executor::{BatchExecutor, ScriptWriterExecutor};
