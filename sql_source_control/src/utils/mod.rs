//! Utilities for sql_source_control
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{checksum, normalize_path, sanitize_file_name, strip_control_characters};
