//! Script concatenation

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::push::ordered_scripts;
use crate::schema::generator::BATCH_SEPARATOR;
use crate::utils::naming::sanitize_file_name;

/// Join every object script under `root` in replay order, data excluded
///
/// Each script is terminated by a `GO` line unless it already ends with one.
pub fn concatenate(root: &Path, output: &OutputConfig) -> Result<String> {
    let mut combined = String::new();

    for path in ordered_scripts(root, output, false)? {
        let content = fs::read_to_string(&path)?;
        let content = content.trim_end();

        combined.push_str(content);
        combined.push('\n');

        if !ends_with_separator(content) {
            combined.push_str(BATCH_SEPARATOR);
            combined.push('\n');
        }

        combined.push('\n');
    }

    Ok(combined)
}

/// Write the concatenated scripts to `<root>/<name>_concatenate.sql`
pub fn write_concatenated(root: &Path, output: &OutputConfig, name: &str) -> Result<PathBuf> {
    let combined = concatenate(root, output)?;
    let path = root.join(sanitize_file_name(&format!("{}_concatenate.sql", name)));

    fs::create_dir_all(root)
        .and_then(|_| fs::write(&path, combined))
        .map_err(|source| Error::WriteError {
            path: path.clone(),
            source,
        })?;

    tracing::info!(file = %path.display(), "Wrote concatenated script");
    Ok(path)
}

fn ends_with_separator(content: &str) -> bool {
    content
        .lines()
        .last()
        .map_or(false, |line| line.trim().eq_ignore_ascii_case(BATCH_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_concatenate_orders_and_terminates_scripts() {
        let dir = tempdir().unwrap();
        let output = OutputConfig::default();

        for (sub, file, body) in [
            ("views", "dbo.V.sql", "CREATE VIEW v AS SELECT 1"),
            ("tables", "dbo.T.sql", "CREATE TABLE t (id int)\nGO"),
            ("schemas", "app.sql", "EXEC('CREATE SCHEMA [app]')"),
            ("data", "dbo.T.sql", "INSERT INTO t VALUES (1)"),
        ] {
            let path = dir.path().join(sub);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join(file), body).unwrap();
        }

        let combined = concatenate(dir.path(), &output).unwrap();
        assert_eq!(
            combined,
            "EXEC('CREATE SCHEMA [app]')\nGO\n\n\
             CREATE TABLE t (id int)\nGO\n\n\
             CREATE VIEW v AS SELECT 1\nGO\n\n"
        );
    }

    #[test]
    fn test_write_concatenated_lands_in_root() {
        let dir = tempdir().unwrap();
        let path = write_concatenated(dir.path(), &OutputConfig::default(), "dev").unwrap();

        assert_eq!(path, dir.path().join("dev_concatenate.sql"));
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }
}
