//! Logging utilities for sql_source_control
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let default_config = LoggingConfig::default();
    let config = config.as_ref().unwrap_or(&default_config);

    let level = parse_level(&config.level);
    let directive: Directive = format!("sql_source_control={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level '{}': {}", config.level, e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(file_path)?;
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file));

        let installed = if json {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };
        installed.map_err(|e| Error::Unknown(e.to_string()))?;
    } else if config.stdout {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stdout);

        let installed = if json {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };
        installed.map_err(|e| Error::Unknown(e.to_string()))?;
    } else {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr);

        let installed = if json {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };
        installed.map_err(|e| Error::Unknown(e.to_string()))?;
    }

    Ok(())
}

/// Parse a level name, defaulting to INFO
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
