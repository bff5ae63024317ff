//! sql_source_control: keeps a SQL Server database under source control
//!
//! A pull reads the database catalog, renders every object into an
//! idempotent T-SQL script and synchronizes those scripts into an output
//! directory, so only real changes show up in version control. A push replays
//! the scripts in dependency order.

pub mod cat;
pub mod config;
pub mod db;
pub mod error;
pub mod push;
pub mod schema;
pub mod sync;
pub mod utils;

use std::path::{Path, PathBuf};

// Re-export main types for easier access
pub use config::Config;
pub use db::{BatchExecutor, CatalogReader, ScriptWriterExecutor, SnapshotCatalog};
pub use error::{Error, Result};
pub use push::PushReport;
pub use schema::generator::ScriptGenerator;
pub use schema::types::Catalog;
pub use sync::{FileSynchronizer, SyncStats};

use config::ConnectionConfig;

/// Load a client from the specified configuration file
pub fn init(config_path: impl AsRef<Path>) -> Result<SqlSourceControl> {
    let config = config::load_from_file(config_path)?;
    Ok(SqlSourceControl::new(config))
}

/// Render every script of `catalog` and synchronize them into `root`
///
/// Nothing is persisted when a script fails to render: the error aborts the
/// run before removals happen and before the cache is written.
pub fn write_catalog(catalog: &Catalog, config: &Config, root: &Path) -> Result<SyncStats> {
    config.output.validate()?;

    let generator = ScriptGenerator::new(config);
    let mut files = FileSynchronizer::open(root, &config.files)?;

    for name in &catalog.schemas {
        files.write_with(&config.output.schemas, &format!("{}.sql", name), || {
            Ok(generator.render_schema(name))
        })?;
    }

    for object in &catalog.objects {
        let dir = config.output.directory(object.kind);
        files.write_with(dir, &object.file_name(), || {
            generator.render_object(object, catalog)
        })?;
    }

    for data in &catalog.data {
        if !config.includes_data_for(&data.dotted_name()) {
            tracing::debug!(table = %data.dotted_name(), "Skipping data for unlisted table");
            continue;
        }

        files.write_with(&config.output.data, &data.file_name(), || {
            generator.render_data(data)
        })?;
    }

    let stats = files.finalize()?;
    tracing::info!(
        added = stats.added,
        updated = stats.updated,
        removed = stats.removed,
        root = %root.display(),
        "Pull finished"
    );

    Ok(stats)
}

/// The main client, bound to one configuration
pub struct SqlSourceControl {
    config: Config,
}

impl SqlSourceControl {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select a connection; `None` when none is named and none is configured
    pub fn connection(&self, name: Option<&str>) -> Result<Option<&ConnectionConfig>> {
        if name.is_none() && self.config.connections.is_empty() {
            return Ok(None);
        }

        self.config.get_connection(name).map(Some)
    }

    /// Output root for a connection
    pub fn root(&self, connection: Option<&str>) -> Result<PathBuf> {
        let connection = self.connection(connection)?;
        self.config.output_root(connection)
    }

    /// Read the catalog and synchronize its scripts into the output root
    pub async fn pull<R>(&self, reader: &R, connection: Option<&str>) -> Result<SyncStats>
    where
        R: CatalogReader + ?Sized,
    {
        let root = self.root(connection)?;
        let catalog = reader.read_catalog(&self.config.data).await?;

        write_catalog(&catalog, &self.config, &root)
    }

    /// Replay every script under the output root, data included
    pub async fn push<E>(&self, executor: &E, connection: Option<&str>) -> Result<PushReport>
    where
        E: BatchExecutor + ?Sized,
    {
        let root = self.root(connection)?;
        let scripts = push::ordered_scripts(&root, &self.config.output, true)?;

        tracing::info!(scripts = scripts.len(), root = %root.display(), "Pushing scripts");
        let report = push::push(executor, &root, &scripts, self.config.push.continue_on_error).await?;

        if !report.is_success() {
            tracing::warn!(failed = report.failures.len(), "Push finished with failed batches");
        }

        Ok(report)
    }

    /// Concatenate the object scripts into a single file under the root
    pub fn cat(&self, connection: Option<&str>) -> Result<PathBuf> {
        let selected = self.connection(connection)?;
        let root = self.config.output_root(selected)?;

        let name = match selected {
            Some(conn) if !conn.name.is_empty() => conn.name.clone(),
            _ => root
                .file_name()
                .map(|n| n.to_string_lossy().trim_start_matches(['.', '_']).to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "database".to_string()),
        };

        cat::write_concatenated(&root, &self.config.output, &name)
    }
}
