//! Error types for sql_source_control

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sql_source_control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sql_source_control
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Render error for {object}: {reason}")]
    RenderError { object: String, reason: String },

    #[error("Write error at {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution error in {script}: {reason}")]
    ExecutionError { script: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    pub(crate) fn render(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::RenderError {
            object: object.into(),
            reason: reason.into(),
        }
    }
}

/// Convert Serde JSON errors to sql_source_control errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to sql_source_control errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(error: toml::ser::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to sql_source_control errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
