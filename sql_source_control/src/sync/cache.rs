//! File checksum cache
//!
//! A snapshot of `root-relative path -> checksum` for every script written
//! by the last successful pull, stored as `cache.json` under the output root.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cache file name inside the output root
pub const DEFAULT_CACHE_FILE: &str = "cache.json";

/// On-disk shape of the cache file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    files: BTreeMap<String, String>,
}

/// Checksums of generated files, keyed by normalized path
#[derive(Debug, Clone)]
pub struct ChecksumCache {
    path: PathBuf,
    files: BTreeMap<String, String>,
}

impl ChecksumCache {
    /// Create an empty cache stored under `root`
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(DEFAULT_CACHE_FILE),
            files: BTreeMap::new(),
        }
    }

    /// Load the cache stored under `root`
    ///
    /// A missing file yields an empty cache. A file that cannot be parsed is a
    /// configuration error; it is never silently discarded.
    pub fn load(root: &Path) -> Result<Self> {
        let mut cache = Self::new(root);

        if !cache.path.exists() {
            return Ok(cache);
        }

        let content = fs::read_to_string(&cache.path)?;
        let document: CacheDocument = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!(
                "Could not parse cache file {} ({}). Try deleting it.",
                cache.path.display(),
                e
            ))
        })?;

        cache.files = document.files;
        Ok(cache)
    }

    /// Whether `checksum` differs from the recorded checksum of `file`
    pub fn has_changed(&self, file: &str, checksum: &str) -> bool {
        match self.files.get(file) {
            Some(previous) => previous != checksum,
            None => true,
        }
    }

    /// Record the checksum of `file`; empty keys or values are ignored
    pub fn record(&mut self, file: &str, checksum: &str) {
        if file.is_empty() || checksum.is_empty() {
            return;
        }

        self.files.insert(file.to_string(), checksum.to_string());
    }

    pub fn get(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Replace the on-disk snapshot with this cache
    ///
    /// Writes a sibling temp file and renames it over the cache file, so an
    /// interrupted write leaves the previous snapshot intact.
    pub fn persist(&self) -> Result<()> {
        let document = CacheDocument {
            files: self.files.clone(),
        };
        let data = serde_json::to_vec_pretty(&document)?;

        write_atomic(&self.path, &data).map_err(|source| Error::WriteError {
            path: self.path.clone(),
            source,
        })
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CACHE_FILE.to_string());
    let tmp_path = path.with_file_name(format!("{}.tmp", file_name));

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let cache = ChecksumCache::load(dir.path()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persist_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut cache = ChecksumCache::new(dir.path());
        cache.record("tables/dbo.Users.sql", "abc");
        cache.record("views/dbo.Active.sql", "def");
        cache.persist().unwrap();

        let loaded = ChecksumCache::load(dir.path()).unwrap();
        assert_eq!(loaded.files(), cache.files());
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CACHE_FILE), "{ not json").unwrap();

        let err = ChecksumCache::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_document_without_files_key_is_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CACHE_FILE), "{}").unwrap();

        let cache = ChecksumCache::load(dir.path()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_has_changed_and_record() {
        let dir = tempdir().unwrap();
        let mut cache = ChecksumCache::new(dir.path());
        assert!(cache.has_changed("a.sql", "1"));

        cache.record("a.sql", "1");
        assert!(!cache.has_changed("a.sql", "1"));
        assert!(cache.has_changed("a.sql", "2"));

        cache.record("", "1");
        cache.record("b.sql", "");
        assert_eq!(cache.len(), 1);
    }
}
