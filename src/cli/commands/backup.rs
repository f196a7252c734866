//! Backup command

use std::path::PathBuf;

use etl_pipeline::archive::{BackupReport, upload_backup};
use etl_pipeline::pipeline::open_object_store;

use super::{OutputFormat, load_config, runtime, to_json};
use crate::error::CliError;

/// Backup command arguments
#[derive(Debug, Clone)]
pub struct BackupArgs {
    pub config: PathBuf,
    pub format: OutputFormat,
}

/// Archive the configured paths and upload the zip
pub fn handle_backup(args: &BackupArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;

    let rt = runtime()?;
    let report = rt.block_on(async {
        let store = open_object_store(&config).await?;
        Ok::<_, CliError>(upload_backup(store.as_ref(), &config.storage.bucket, &config.backup).await)
    })?;

    match args.format {
        OutputFormat::Json => println!("{}", to_json(&report)?),
        OutputFormat::Text => match &report {
            BackupReport::Uploaded {
                key,
                entries,
                bytes,
                sha256,
            } => println!(
                "Uploaded {} ({} files, {} bytes, sha256 {})",
                key, entries, bytes, sha256
            ),
            BackupReport::Failed { key, reason } => println!("Backup {} failed: {}", key, reason),
        },
    }

    match report {
        BackupReport::Uploaded { .. } => Ok(()),
        BackupReport::Failed { reason, .. } => Err(CliError::BackupFailed(reason)),
    }
}
