//! File synchronization
//!
//! Reconciles the scripts generated by one pull against the managed files
//! already under the output root. Every write is classified against the
//! previous checksum cache; files that were not written again are removed
//! when the run is finalized.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::sync::cache::ChecksumCache;
use crate::utils::naming::{checksum, normalize_path, sanitize_file_name, strip_control_characters};

/// Extension of managed script files
pub const SCRIPT_EXTENSION: &str = "sql";

/// Counts of files touched by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully added {}, updated {}, and removed {} files.",
            self.added, self.updated, self.removed
        )
    }
}

/// How a single write was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist before this run
    Added,
    /// The file existed and its content changed
    Updated,
    /// The file existed with the same content
    Unchanged,
    /// The file is outside the include/exclude filter
    Skipped,
}

/// Include/exclude glob filter over script paths
///
/// Patterns apply in order: a plain pattern includes matching paths, a
/// `!pattern` excludes them again. A pattern matches a path when it matches
/// either the file name or the root-relative path. An empty filter includes
/// everything.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    patterns: Vec<(bool, Option<Pattern>)>,
}

impl FileFilter {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|raw| {
                let (negated, glob) = match raw.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, raw.as_str()),
                };

                let pattern = match Pattern::new(glob) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        tracing::warn!(pattern = %raw, error = %e, "Ignoring malformed file pattern");
                        None
                    }
                };

                (negated, pattern)
            })
            .collect();

        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a root-relative, forward-slash path passes the filter
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        let mut included = false;

        for (negated, pattern) in &self.patterns {
            let hit = pattern
                .as_ref()
                .map_or(false, |p| p.matches(file_name) || p.matches(relative_path));

            if hit {
                included = !negated;
            }
        }

        included
    }
}

/// Tracks one pull against an output root
pub struct FileSynchronizer {
    root: PathBuf,
    filter: FileFilter,
    existing: BTreeSet<String>,
    /// Keys written this run, with the file name that produced each
    written: BTreeMap<String, String>,
    existing_cache: ChecksumCache,
    new_cache: ChecksumCache,
    stats: SyncStats,
}

impl FileSynchronizer {
    /// Load the previous cache and discover managed files under `root`
    pub fn open(root: &Path, patterns: &[String]) -> Result<Self> {
        let filter = FileFilter::new(patterns);
        let existing_cache = ChecksumCache::load(root)?;
        let existing = scan_managed_files(root, &filter)?;

        // entries outside the filter are not part of this run; keep them
        let mut new_cache = ChecksumCache::new(root);
        for (file, sum) in existing_cache.files() {
            if !filter.matches(file) {
                new_cache.record(file, sum);
            }
        }

        tracing::debug!(
            root = %root.display(),
            existing = existing.len(),
            cached = existing_cache.len(),
            "Loaded output root"
        );

        Ok(Self {
            root: root.to_path_buf(),
            filter,
            existing,
            written: BTreeMap::new(),
            existing_cache,
            new_cache,
            stats: SyncStats::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Managed files not yet written during this run
    pub fn pending_removals(&self) -> impl Iterator<Item = &str> {
        self.existing.iter().map(String::as_str)
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Cache key for a file in an output directory
    pub fn relative_key(dir: &str, file_name: &str) -> String {
        normalize_path(&Path::new(dir).join(sanitize_file_name(file_name)))
    }

    /// Write already rendered content
    pub fn write(&mut self, dir: &str, file_name: &str, content: &str) -> Result<WriteOutcome> {
        self.write_with(dir, file_name, || Ok(content.to_string()))
    }

    /// Write the content produced by `render`, rendering only when the file
    /// passes the filter
    pub fn write_with<F>(&mut self, dir: &str, file_name: &str, render: F) -> Result<WriteOutcome>
    where
        F: FnOnce() -> Result<String>,
    {
        let key = Self::relative_key(dir, file_name);

        if !self.filter.matches(&key) {
            tracing::debug!(file = %key, "Skipping file outside the file filter");
            return Ok(WriteOutcome::Skipped);
        }

        // distinct names can sanitize to the same file
        if let Some(previous) = self.written.get(&key) {
            return Err(Error::render(
                file_name,
                format!("file {} was already written for {}", key, previous),
            ));
        }

        let content = strip_control_characters(&render()?);
        let sum = checksum(&content);
        self.new_cache.record(&key, &sum);

        let outcome = if !self.existing.contains(&key) {
            WriteOutcome::Added
        } else if self.existing_cache.has_changed(&key, &sum) {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Unchanged
        };

        let path = self.root.join(&key);
        write_file(&path, &content)?;

        match outcome {
            WriteOutcome::Added => {
                self.stats.added += 1;
                tracing::info!(file = %key, "Created");
            }
            WriteOutcome::Updated => {
                self.stats.updated += 1;
                tracing::info!(file = %key, "Updated");
            }
            _ => tracing::debug!(file = %key, "Unchanged"),
        }

        self.existing.remove(&key);
        self.written.insert(key, file_name.to_string());
        Ok(outcome)
    }

    /// Remove files that were not written again and persist the new cache
    pub fn finalize(mut self) -> Result<SyncStats> {
        for key in std::mem::take(&mut self.existing) {
            let path = self.root.join(&key);

            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(Error::WriteError { path, source }),
            }

            self.stats.removed += 1;
            tracing::info!(file = %key, "Removed");
        }

        self.new_cache.persist()?;
        Ok(self.stats)
    }
}

/// Script files inside sub-directories of `root` that pass the filter
fn scan_managed_files(root: &Path, filter: &FileFilter) -> Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();

    if !root.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(root).min_depth(2).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();

        let is_script = entry.file_type().is_file()
            && path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION));
        if !is_script {
            continue;
        }

        let relative = match path.strip_prefix(root) {
            Ok(relative) => normalize_path(relative),
            Err(_) => continue,
        };

        if filter.matches(&relative) {
            files.insert(relative);
        }
    }

    Ok(files)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let result = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
    .and_then(|_| fs::write(path, content));

    result.map_err(|source| Error::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
