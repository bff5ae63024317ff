//! Output directory synchronization

pub mod cache;
pub mod files;

pub use cache::{ChecksumCache, DEFAULT_CACHE_FILE};
pub use files::{FileFilter, FileSynchronizer, SyncStats, WriteOutcome};
