//! Full pipeline run command

use std::path::PathBuf;

use etl_pipeline::pipeline::{IngestSource, Pipeline};

use super::{OutputFormat, load_config, runtime, to_json};
use crate::error::CliError;

/// Run command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    pub config: PathBuf,
    /// Base table name override
    pub table: Option<String>,
    /// Source object key override
    pub source_key: Option<String>,
    /// Local CSV to ingest instead of downloading
    pub source_file: Option<PathBuf>,
    /// Skip the source backup
    pub skip_backup: bool,
    /// Fail when any artifact failed
    pub strict: bool,
    pub format: OutputFormat,
}

/// Ingest, transform, persist and publish, then release the database
pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;

    if let Some(table) = &args.table {
        config.source.table = table.clone();
    }
    if let Some(key) = &args.source_key {
        config.source.key = key.clone();
    }
    if args.skip_backup {
        config.backup.enabled = false;
    }

    let source = match &args.source_file {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::InvalidArgument(format!(
                    "Source file not found: {}",
                    path.display()
                )));
            }
            IngestSource::File(path.clone())
        }
        None => IngestSource::from_config(&config.source),
    };

    let rt = runtime()?;
    let summary = rt.block_on(async {
        let pipeline = Pipeline::connect(config).await?;
        pipeline.run_to_completion(&source).await
    })?;

    match args.format {
        OutputFormat::Text => println!("{}", summary),
        OutputFormat::Json => println!("{}", to_json(&summary)?),
    }

    let failures = summary.failures().len();
    if args.strict && !summary.is_success() {
        return Err(CliError::ArtifactsFailed(failures));
    }

    Ok(())
}
