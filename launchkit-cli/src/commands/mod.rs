//! CLI subcommands.

pub mod config;
pub mod install;
pub mod status;

use std::path::{Path, PathBuf};

use launchkit::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Resolve the configuration file path: explicit flag or the default location.
pub fn config_path(custom: Option<&Path>) -> Result<PathBuf, CliError> {
    match custom {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_file_path()?),
    }
}

/// Load configuration.
///
/// A missing default file yields an empty configuration; a missing file
/// given with `--config` is an error.
pub fn load_config(custom: Option<&Path>) -> Result<ConfigFile, CliError> {
    match custom {
        Some(path) if !path.exists() => Err(CliError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        ))),
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_explicit_config_is_error() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("absent.ini")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[release]\nowner = acme\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.release.owner.as_deref(), Some("acme"));
    }
}
