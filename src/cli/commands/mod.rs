//! CLI command handlers

pub mod backup;
pub mod config;
pub mod run;
pub mod transforms;

use std::path::Path;

use etl_pipeline::config::PipelineConfig;

use crate::error::CliError;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load the config file (defaults when absent) with environment overrides
pub fn load_config(path: &Path) -> Result<PipelineConfig, CliError> {
    PipelineConfig::load(path).map_err(|e| CliError::ConfigError(path.to_path_buf(), e))
}

/// Build a single-threaded runtime; the pipeline never runs calls concurrently
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}

/// Render a value as pretty JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::SerializationError(e.to_string()))
}
