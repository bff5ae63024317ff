//! ssc - command line entry point

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use sql_source_control::config::{self, ConnectionConfig};
use sql_source_control::utils::logging::init_logging;
use sql_source_control::{Config, ScriptWriterExecutor, SnapshotCatalog, SqlSourceControl};

/// Script a SQL Server database into source-controlled files
#[derive(Parser, Debug)]
#[command(name = "ssc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ssc.toml, then ssc.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Script the catalog into the output directory
    Pull {
        /// Connection name (default: first configured)
        name: Option<String>,

        /// Catalog snapshot (JSON) to read instead of a live database
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
    },

    /// Replay all scripts in dependency order
    Push {
        /// Connection name (default: first configured)
        name: Option<String>,

        /// Write the batches to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Concatenate all object scripts into one file
    Cat {
        /// Connection name (default: first configured)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Init { force } = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILES[0]));
        return write_starter_config(&path, force);
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    let client = SqlSourceControl::new(config);

    match cli.command {
        Command::Init { .. } => Ok(()),
        Command::Pull { name, snapshot } => {
            let reader = SnapshotCatalog::load(&snapshot)?;
            let stats = client.pull(&reader, name.as_deref()).await?;
            println!("{}", stats);
            Ok(())
        }
        Command::Push { name, out } => {
            let writer: Box<dyn Write + Send> = match out {
                Some(path) => Box::new(BufWriter::new(
                    File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                )),
                None => Box::new(io::stdout()),
            };

            let executor = ScriptWriterExecutor::new(writer);
            let report = client.push(&executor, name.as_deref()).await?;

            eprintln!(
                "Pushed {} batches from {} scripts.",
                report.batches, report.scripts
            );
            if !report.is_success() {
                for failure in &report.failures {
                    eprintln!("  {} (batch {}): {}", failure.script, failure.batch + 1, failure.reason);
                }
                bail!("{} batches failed", report.failures.len());
            }
            Ok(())
        }
        Command::Cat { name } => {
            let path = client.cat(name.as_deref())?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => config::find_default(Path::new(".")),
    };

    match path {
        Some(path) => config::load_from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn write_starter_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, use --force to overwrite", path.display());
    }

    let config = Config {
        connections: vec![ConnectionConfig {
            name: "dev".to_string(),
            server: "localhost".to_string(),
            database: "master".to_string(),
            port: Some(1433),
            ..ConnectionConfig::default()
        }],
        ..Config::default()
    };

    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
