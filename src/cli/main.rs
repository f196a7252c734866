//! CLI binary entry point for etl-pipeline

mod commands;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use etl_pipeline::config::CONFIG_FILENAME;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::OutputFormat;
use commands::backup::{BackupArgs, handle_backup};
use commands::config::{handle_config_init, handle_config_show};
use commands::run::{RunArgs, handle_run};
use commands::transforms::handle_transforms;

/// Default log file, appended to across runs
const DEFAULT_LOG_FILE: &str = "etl_log.txt";

#[derive(Parser)]
#[command(name = "etl-pipeline")]
#[command(about = "Batch ETL: ingest a CSV, derive eight tables, persist and publish them")]
#[command(version)]
struct Cli {
    /// File the JSON log is appended to
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one dataset
    Run {
        /// Config file (defaults apply when absent)
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
        /// Base table name
        #[arg(short, long)]
        table: Option<String>,
        /// Object key of the source CSV
        #[arg(long)]
        source_key: Option<String>,
        /// Ingest a local CSV instead of downloading the source object
        #[arg(long, conflicts_with = "source_key")]
        source_file: Option<PathBuf>,
        /// Do not upload the source backup
        #[arg(long)]
        skip_backup: bool,
        /// Exit non-zero if any artifact failed
        #[arg(long)]
        strict: bool,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Archive the configured paths and upload the zip
    Backup {
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List the transform catalog
    Transforms,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a sample configuration file
    Init {
        #[arg(default_value = CONFIG_FILENAME)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        #[arg(default_value = CONFIG_FILENAME)]
        path: PathBuf,
    },
}

/// Install stderr and JSON file logging; the guard flushes the file on drop
fn init_tracing(log_file: &Path) -> anyhow::Result<WorkerGuard> {
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().json().with_writer(writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let guard = init_tracing(&cli.log_file)?;

    let result = match cli.command {
        Commands::Run {
            config,
            table,
            source_key,
            source_file,
            skip_backup,
            strict,
            format,
        } => {
            let args = RunArgs {
                config,
                table,
                source_key,
                source_file,
                skip_backup,
                strict,
                format,
            };
            handle_run(&args)
        }

        Commands::Backup { config, format } => handle_backup(&BackupArgs { config, format }),

        Commands::Config { command } => match command {
            ConfigCommands::Init { path, force } => handle_config_init(&path, force),
            ConfigCommands::Show { path } => handle_config_show(&path),
        },

        Commands::Transforms => {
            handle_transforms();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        drop(guard);
        std::process::exit(1);
    }

    Ok(())
}
