//! Configuration handling for sql_source_control

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::types::ObjectKind;

/// Configuration files looked up in the working directory, in order
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["ssc.toml", "ssc.json"];

/// Load configuration from a TOML, JSON or YAML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("toml")
        .to_lowercase();

    let config: Config = match extension.as_str() {
        "json" => serde_json::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?,
        "yaml" | "yml" => serde_yaml::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?,
        _ => toml::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?,
    };

    config.validate()?;
    Ok(config)
}

/// Find the first default configuration file present in `dir`
pub fn find_default(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Represents the complete configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Glob patterns selecting which script files a pull manages
    pub files: Vec<String>,
    /// Tables (`schema.name`) whose rows are scripted
    pub data: Vec<String>,
    pub output: OutputConfig,
    pub idempotency: IdempotencyConfig,
    pub push: PushConfig,
    pub logging: Option<LoggingConfig>,
    pub connections: Vec<ConnectionConfig>,
}

impl Config {
    /// Reject idempotency modes that make no sense for the kind they are set on
    pub fn validate(&self) -> Result<()> {
        let objects = [
            ("tables", self.idempotency.tables),
            ("views", self.idempotency.views),
            ("procs", self.idempotency.procs),
            ("functions", self.idempotency.functions),
            ("triggers", self.idempotency.triggers),
            ("types", self.idempotency.types),
        ];

        for (key, mode) in objects {
            if mode.is_data_only() {
                return Err(Error::ConfigError(format!(
                    "idempotency.{} cannot be '{}', it only applies to data scripts",
                    key,
                    mode.as_str()
                )));
            }
        }

        if self.idempotency.data.is_object_only() {
            return Err(Error::ConfigError(format!(
                "idempotency.data cannot be '{}'",
                self.idempotency.data.as_str()
            )));
        }

        self.output.validate()
    }

    /// Get a connection by name, or the first one when `name` is not given
    pub fn get_connection(&self, name: Option<&str>) -> Result<&ConnectionConfig> {
        match name {
            Some(name) => self
                .connections
                .iter()
                .find(|conn| conn.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    Error::ConfigError(format!("Could not find connection by name '{}'", name))
                }),
            None => self
                .connections
                .first()
                .ok_or_else(|| Error::ConfigError("Could not find default connection".to_string())),
        }
    }

    /// Resolve the output root: the configured root, else the connection's name
    pub fn output_root(&self, connection: Option<&ConnectionConfig>) -> Result<PathBuf> {
        if !self.output.root.is_empty() {
            return Ok(PathBuf::from(&self.output.root));
        }

        match connection {
            Some(conn) if !conn.name.is_empty() => Ok(PathBuf::from(&conn.name)),
            _ => Err(Error::ConfigError(
                "output.root is empty and no connection name is available".to_string(),
            )),
        }
    }

    /// Whether rows of `schema.name` should be scripted
    pub fn includes_data_for(&self, qualified_name: &str) -> bool {
        self.data
            .iter()
            .any(|table| table.eq_ignore_ascii_case(qualified_name))
    }

    /// Render this configuration as a TOML document
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Database connection details, kept for naming and selection only
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConnectionConfig {
    pub name: String,
    pub server: String,
    pub database: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Paths where scripts are written, each directory relative to `root`
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub root: String,
    pub schemas: String,
    pub tables: String,
    pub types: String,
    pub views: String,
    pub functions: String,
    pub procs: String,
    pub triggers: String,
    pub data: String,
}

impl OutputConfig {
    /// Every output directory must be a sub-directory of the root
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("schemas", &self.schemas),
            ("tables", &self.tables),
            ("types", &self.types),
            ("views", &self.views),
            ("functions", &self.functions),
            ("procs", &self.procs),
            ("triggers", &self.triggers),
            ("data", &self.data),
        ];

        for (key, dir) in dirs {
            let path = Path::new(dir);
            let escapes = path.is_absolute()
                || path.components().any(|c| {
                    matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
                });
            let nested = path.components().any(|c| matches!(c, Component::Normal(_)));

            if escapes || !nested {
                return Err(Error::ConfigError(format!(
                    "output.{} must be a relative sub-directory of the output root, got '{}'",
                    key, dir
                )));
            }
        }

        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "./_sql-database".to_string(),
            schemas: "./schemas".to_string(),
            tables: "./tables".to_string(),
            types: "./types".to_string(),
            views: "./views".to_string(),
            functions: "./functions".to_string(),
            procs: "./stored-procedures".to_string(),
            triggers: "./triggers".to_string(),
            data: "./data".to_string(),
        }
    }
}

impl OutputConfig {
    /// Output directory for an object kind
    pub fn directory(&self, kind: ObjectKind) -> &str {
        match kind {
            ObjectKind::Table => &self.tables,
            ObjectKind::View => &self.views,
            ObjectKind::Procedure => &self.procs,
            ObjectKind::ScalarFunction
            | ObjectKind::TableFunction
            | ObjectKind::InlineFunction => &self.functions,
            ObjectKind::Trigger => &self.triggers,
            ObjectKind::Type => &self.types,
        }
    }

    /// Directories in the order scripts must be replayed
    pub fn replay_order(&self, include_data: bool) -> Vec<&str> {
        let mut dirs = vec![
            self.schemas.as_str(),
            self.tables.as_str(),
            self.types.as_str(),
            self.views.as_str(),
            self.functions.as_str(),
            self.procs.as_str(),
            self.triggers.as_str(),
        ];

        if include_data {
            dirs.push(self.data.as_str());
        }

        dirs
    }
}

/// How a script guards against being applied twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdempotencyMode {
    IfExistsDrop,
    IfNotExists,
    None,
    Truncate,
    Delete,
    DeleteAndReseed,
}

impl IdempotencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotencyMode::IfExistsDrop => "if-exists-drop",
            IdempotencyMode::IfNotExists => "if-not-exists",
            IdempotencyMode::None => "none",
            IdempotencyMode::Truncate => "truncate",
            IdempotencyMode::Delete => "delete",
            IdempotencyMode::DeleteAndReseed => "delete-and-reseed",
        }
    }

    pub fn is_data_only(&self) -> bool {
        matches!(
            self,
            IdempotencyMode::Truncate | IdempotencyMode::Delete | IdempotencyMode::DeleteAndReseed
        )
    }

    pub fn is_object_only(&self) -> bool {
        matches!(self, IdempotencyMode::IfExistsDrop | IdempotencyMode::IfNotExists)
    }
}

/// Idempotency mode per object kind
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub data: IdempotencyMode,
    pub functions: IdempotencyMode,
    pub procs: IdempotencyMode,
    pub tables: IdempotencyMode,
    pub triggers: IdempotencyMode,
    pub types: IdempotencyMode,
    pub views: IdempotencyMode,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            data: IdempotencyMode::Truncate,
            functions: IdempotencyMode::IfExistsDrop,
            procs: IdempotencyMode::IfExistsDrop,
            tables: IdempotencyMode::IfNotExists,
            triggers: IdempotencyMode::IfExistsDrop,
            types: IdempotencyMode::IfNotExists,
            views: IdempotencyMode::IfExistsDrop,
        }
    }
}

impl IdempotencyConfig {
    pub fn mode_for(&self, kind: ObjectKind) -> IdempotencyMode {
        match kind {
            ObjectKind::Table => self.tables,
            ObjectKind::View => self.views,
            ObjectKind::Procedure => self.procs,
            ObjectKind::ScalarFunction
            | ObjectKind::TableFunction
            | ObjectKind::InlineFunction => self.functions,
            ObjectKind::Trigger => self.triggers,
            ObjectKind::Type => self.types,
        }
    }
}

/// Replay settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PushConfig {
    /// Keep executing remaining batches after one fails
    pub continue_on_error: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    /// Log to stdout instead of stderr when no file is set
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: false,
        }
    }
}
