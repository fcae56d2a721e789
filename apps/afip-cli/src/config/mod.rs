//! Configuration loading for the afip CLI

mod paths;

pub use paths::ConfigPaths;

use crate::error::{CliError, CliResult};
use afip_auth::AfipConfig;
use std::path::Path;

/// Load the configuration.
///
/// Precedence: the `--config` file, then `config.json` in the platform
/// config directory, then `AFIP_*` environment variables.
pub fn load(explicit: Option<&Path>) -> CliResult<AfipConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CliError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return load_file(path);
    }

    let paths = ConfigPaths::new()?;
    if let Some(file) = paths.existing_file() {
        return load_file(file);
    }

    tracing::debug!(
        config_dir = %paths.config_dir.display(),
        searched = %paths.config_file.display(),
        "No config file, reading AFIP_* environment"
    );
    Ok(AfipConfig::from_env()?)
}

fn load_file(path: &Path) -> CliResult<AfipConfig> {
    tracing::debug!(path = %path.display(), "Loading config file");
    Ok(AfipConfig::from_file(path)?)
}
