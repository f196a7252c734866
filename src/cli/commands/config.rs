//! Config file commands

use std::path::Path;

use etl_pipeline::config::sample_config;

use super::load_config;
use crate::error::CliError;

/// Write the sample configuration file
pub fn handle_config_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::FileExists(path.to_path_buf()));
    }

    std::fs::write(path, sample_config())
        .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string()))?;

    println!("Wrote {}", path.display());
    Ok(())
}

/// Print the effective configuration, after environment overrides
pub fn handle_config_show(path: &Path) -> Result<(), CliError> {
    let config = load_config(path)?;
    let content = config
        .to_toml()
        .map_err(|e| CliError::SerializationError(e.to_string()))?;

    print!("{}", content);
    Ok(())
}
