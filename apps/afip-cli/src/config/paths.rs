//! Where the afip CLI looks for its config file

use crate::error::{CliError, CliResult};
use std::path::{Path, PathBuf};

/// Overrides the platform config directory.
pub const CONFIG_DIR_ENV: &str = "AFIP_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved lookup location for `config.json`.
///
/// - Linux: ~/.config/afip/
/// - macOS: ~/Library/Application Support/afip/
/// - Windows: %APPDATA%\afip\
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> CliResult<Self> {
        Self::resolve(
            std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from),
            dirs::config_dir(),
        )
    }

    /// An empty override counts as unset.
    fn resolve(override_dir: Option<PathBuf>, platform_dir: Option<PathBuf>) -> CliResult<Self> {
        let config_dir = match override_dir.filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => dir,
            None => platform_dir.map(|dir| dir.join("afip")).ok_or_else(|| {
                CliError::Config(format!(
                    "Could not determine configuration directory, set {CONFIG_DIR_ENV} or pass --config"
                ))
            })?,
        };

        Ok(Self::in_dir(config_dir))
    }

    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        }
    }

    /// The config file, if one has been written.
    pub fn existing_file(&self) -> Option<&Path> {
        self.config_file
            .is_file()
            .then_some(self.config_file.as_path())
    }
}
