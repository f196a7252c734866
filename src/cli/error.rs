//! CLI-specific error types

use std::path::PathBuf;

use etl_pipeline::config::ConfigError;
use etl_pipeline::pipeline::PipelineError;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load config {0}: {1}")]
    ConfigError(PathBuf, ConfigError),

    #[error("File already exists: {0} (use --force to overwrite)")]
    FileExists(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    #[error("{0} artifact(s) failed to persist or publish")]
    ArtifactsFailed(usize),

    #[error("Backup failed: {0}")]
    BackupFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
