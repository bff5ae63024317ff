//! Script replay
//!
//! Collects generated scripts in dependency order, splits them into batches
//! on `GO` lines and runs each batch through a [`BatchExecutor`].

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::config::OutputConfig;
use crate::db::executor::BatchExecutor;
use crate::error::{Error, Result};
use crate::sync::files::SCRIPT_EXTENSION;
use crate::utils::naming::normalize_path;

static BATCH_SEPARATOR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*GO[ \t]*\r?$").expect("batch separator pattern is valid")
});

/// A batch that failed while pushing with `continue_on_error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    pub script: String,
    /// Zero-based position of the batch within its script
    pub batch: usize,
    pub reason: String,
}

/// Outcome of a push
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub scripts: usize,
    pub batches: usize,
    pub failures: Vec<PushFailure>,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Script files under `root` in replay order
///
/// Directories follow [`OutputConfig::replay_order`]; files within one
/// directory are sorted by path. Missing directories are skipped.
pub fn ordered_scripts(root: &Path, output: &OutputConfig, include_data: bool) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();

    for dir in output.replay_order(include_data) {
        let dir_path = root.join(dir);
        if !dir_path.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&dir_path).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_script = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION));

            if is_script {
                scripts.push(entry.into_path());
            }
        }
    }

    Ok(scripts)
}

/// Split a script into batches on lines holding only `GO`
pub fn split_batches(script: &str) -> Vec<String> {
    BATCH_SEPARATOR_LINE
        .split(script)
        .map(str::trim)
        .filter(|batch| !batch.is_empty())
        .map(str::to_string)
        .collect()
}

/// Execute every batch of `scripts` in order
///
/// Without `continue_on_error` the first failing batch aborts the push with
/// an [`Error::ExecutionError`]. With it, failures are logged and collected
/// in the report.
pub async fn push<E>(
    executor: &E,
    root: &Path,
    scripts: &[PathBuf],
    continue_on_error: bool,
) -> Result<PushReport>
where
    E: BatchExecutor + ?Sized,
{
    let mut report = PushReport::default();

    for path in scripts {
        let name = path
            .strip_prefix(root)
            .map(normalize_path)
            .unwrap_or_else(|_| normalize_path(path));
        let content = fs::read_to_string(path)?;

        tracing::info!(script = %name, "Executing");

        for (index, batch) in split_batches(&content).iter().enumerate() {
            report.batches += 1;

            if let Err(e) = executor.execute(batch).await {
                if !continue_on_error {
                    return Err(Error::ExecutionError {
                        script: name,
                        reason: format!("batch {}: {}", index + 1, e),
                    });
                }

                tracing::warn!(script = %name, batch = index + 1, error = %e, "Batch failed, continuing");
                report.failures.push(PushFailure {
                    script: name.clone(),
                    batch: index,
                    reason: e.to_string(),
                });
            }
        }

        report.scripts += 1;
    }

    Ok(report)
}
