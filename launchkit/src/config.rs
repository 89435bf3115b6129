//! Configuration file support.
//!
//! Settings live in an INI file, by default `~/.config/launchkit/config.ini`
//! (or the platform equivalent):
//!
//! ```ini
//! [release]
//! owner = acme
//! repo = game-client
//! tag = v1.0.0
//!
//! [paths]
//! install_dir = /games/client
//! extractor = /usr/bin/7za
//! ```
//!
//! Every key is described once by [`ConfigKey`], which drives loading,
//! saving and the `config get/set/list` commands.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{EscapePolicy, Ini};
use thiserror::Error;

use crate::manager::{InstallRequest, ManagerError, ManagerResult, RetryPolicy};

/// Directory name under the platform config directory.
pub const CONFIG_DIRNAME: &str = "launchkit";

/// Configuration file name.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Log levels accepted in `[logging] level`.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Starting point written by `config init`.
pub const CONFIG_TEMPLATE: &str = "\
; launchkit configuration

[release]
; Repository hosting the client releases
owner =
repo =
tag =
; Personal access token for private repositories (GITHUB_TOKEN also works)
; token =
; api_url = https://api.github.com

[paths]
install_dir =
; Defaults to <install_dir>/_downloads/<tag>
; download_dir =
extractor =

[install]
cleanup_parts = true
skip_if_installed = true
max_attempts = 3
retry_delay_ms = 1500
; Refuse to install without room for parts, client and 1 GiB
check_space = true

[logging]
level = info
; file =
";

/// Errors from reading, writing or editing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but could not be read or parsed.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: ini::Error },

    /// The file could not be written.
    #[error("failed to write config file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The platform has no configuration directory.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// A value could not be parsed for its key.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The key is not a known `section.key`.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[release]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSettings {
    pub download_dir: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
    pub extractor: Option<PathBuf>,
}

/// `[install]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSettings {
    pub cleanup_parts: Option<bool>,
    pub skip_if_installed: Option<bool>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub check_space: Option<bool>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// Parsed configuration file. Unset keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub release: ReleaseSettings,
    pub paths: PathSettings,
    pub install: InstallSettings,
    pub logging: LoggingSettings,
}

/// Default configuration file path.
pub fn config_file_path() -> Result<PathBuf, ConfigFileError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIRNAME).join(CONFIG_FILENAME))
        .ok_or(ConfigFileError::NoConfigDir)
}

impl ConfigFile {
    /// Load from the default location.
    ///
    /// A missing file yields the default (empty) configuration.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        // No escape processing: Windows paths are written with bare backslashes
        let ini = Ini::load_from_file_noescape(path).map_err(|e| ConfigFileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ini(&ini)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path()?)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_err = |e: io::Error| ConfigFileError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini()
            .write_to_file_policy(path, EscapePolicy::Nothing)
            .map_err(write_err)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Build an install request from the configured values.
    ///
    /// # Errors
    ///
    /// [`ManagerError::InvalidConfig`] naming the first required key that
    /// is not set.
    pub fn to_request(&self) -> ManagerResult<InstallRequest> {
        let owner = required(&self.release.owner, ConfigKey::ReleaseOwner)?;
        let repo = required(&self.release.repo, ConfigKey::ReleaseRepo)?;
        let tag = required(&self.release.tag, ConfigKey::ReleaseTag)?;
        let install_dir = required(&self.paths.install_dir, ConfigKey::PathsInstallDir)?;
        let extractor = required(&self.paths.extractor, ConfigKey::PathsExtractor)?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            self.install.max_attempts.unwrap_or(defaults.max_attempts),
            self.install
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
        );

        let mut request = InstallRequest::new(owner, repo, tag, install_dir, extractor)
            .with_token(self.release.token.clone())
            .with_cleanup_parts(self.install.cleanup_parts.unwrap_or(true))
            .with_skip_if_installed(self.install.skip_if_installed.unwrap_or(true))
            .with_retry(retry);

        if self.install.check_space == Some(false) {
            request = request.with_space_margin(None);
        }

        if let Some(dir) = &self.paths.download_dir {
            request = request.with_download_dir(dir);
        }
        if let Some(url) = &self.release.api_url {
            request = request.with_api_base_url(url);
        }

        Ok(request)
    }
}

fn shown<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn required<T: Clone>(value: &Option<T>, key: ConfigKey) -> ManagerResult<T> {
    value.clone().ok_or_else(|| {
        ManagerError::InvalidConfig(format!(
            "{} is not set (config.ini [{}] section or command-line flag)",
            key.name(),
            key.section()
        ))
    })
}

/// A single configuration setting, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ReleaseOwner,
    ReleaseRepo,
    ReleaseTag,
    ReleaseToken,
    ReleaseApiUrl,
    PathsDownloadDir,
    PathsInstallDir,
    PathsExtractor,
    InstallCleanupParts,
    InstallSkipIfInstalled,
    InstallMaxAttempts,
    InstallRetryDelayMs,
    InstallCheckSpace,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            ReleaseOwner,
            ReleaseRepo,
            ReleaseTag,
            ReleaseToken,
            ReleaseApiUrl,
            PathsDownloadDir,
            PathsInstallDir,
            PathsExtractor,
            InstallCleanupParts,
            InstallSkipIfInstalled,
            InstallMaxAttempts,
            InstallRetryDelayMs,
            LoggingLevel,
            LoggingFile,
        ]
    }

    /// INI section holding the key.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            ReleaseOwner | ReleaseRepo | ReleaseTag | ReleaseToken | ReleaseApiUrl => "release",
            PathsDownloadDir | PathsInstallDir | PathsExtractor => "paths",
            InstallCleanupParts | InstallSkipIfInstalled | InstallMaxAttempts
            | InstallRetryDelayMs | InstallCheckSpace => "install",
            LoggingLevel | LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            ReleaseOwner => "owner",
            ReleaseRepo => "repo",
            ReleaseTag => "tag",
            ReleaseToken => "token",
            ReleaseApiUrl => "api_url",
            PathsDownloadDir => "download_dir",
            PathsInstallDir => "install_dir",
            PathsExtractor => "extractor",
            InstallCleanupParts => "cleanup_parts",
            InstallSkipIfInstalled => "skip_if_installed",
            InstallMaxAttempts => "max_attempts",
            InstallRetryDelayMs => "retry_delay_ms",
            InstallCheckSpace => "check_space",
            LoggingLevel => "level",
            LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Whether the value should be hidden when displayed.
    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::ReleaseToken)
    }

    /// Current value as a string, empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let path = |v: &Option<PathBuf>| {
            v.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };

        match self {
            ReleaseOwner => text(&config.release.owner),
            ReleaseRepo => text(&config.release.repo),
            ReleaseTag => text(&config.release.tag),
            ReleaseToken => text(&config.release.token),
            ReleaseApiUrl => text(&config.release.api_url),
            PathsDownloadDir => path(&config.paths.download_dir),
            PathsInstallDir => path(&config.paths.install_dir),
            PathsExtractor => path(&config.paths.extractor),
            InstallCleanupParts => shown(config.install.cleanup_parts),
            InstallSkipIfInstalled => shown(config.install.skip_if_installed),
            InstallMaxAttempts => shown(config.install.max_attempts),
            InstallRetryDelayMs => shown(config.install.retry_delay_ms),
            InstallCheckSpace => shown(config.install.check_space),
            LoggingLevel => text(&config.logging.level),
            LoggingFile => path(&config.logging.file),
        }
    }

    /// Parse and store `value`. A blank value clears the key.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        use ConfigKey::*;
        let value = value.trim();
        let text = || (!value.is_empty()).then(|| value.to_string());
        let path = || (!value.is_empty()).then(|| PathBuf::from(value));

        match self {
            ReleaseOwner => config.release.owner = text(),
            ReleaseRepo => config.release.repo = text(),
            ReleaseTag => config.release.tag = text(),
            ReleaseToken => config.release.token = text(),
            ReleaseApiUrl => config.release.api_url = text(),
            PathsDownloadDir => config.paths.download_dir = path(),
            PathsInstallDir => config.paths.install_dir = path(),
            PathsExtractor => config.paths.extractor = path(),
            InstallCleanupParts => config.install.cleanup_parts = self.parse_bool(value)?,
            InstallSkipIfInstalled => config.install.skip_if_installed = self.parse_bool(value)?,
            InstallMaxAttempts => {
                let attempts = self.parse_number::<u32>(value)?;
                if attempts == Some(0) {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.install.max_attempts = attempts;
            }
            InstallRetryDelayMs => config.install.retry_delay_ms = self.parse_number(value)?,
            InstallCheckSpace => config.install.check_space = self.parse_bool(value)?,
            LoggingLevel => {
                let level = text().map(|l| l.to_lowercase());
                if let Some(level) = &level {
                    if !LOG_LEVELS.contains(&level.as_str()) {
                        return Err(self.invalid(value, "expected error, warn, info, debug or trace"));
                    }
                }
                config.logging.level = level;
            }
            LoggingFile => config.logging.file = path(),
        }
        Ok(())
    }

    fn parse_bool(&self, value: &str) -> Result<Option<bool>, ConfigFileError> {
        match value.to_lowercase().as_str() {
            "" => Ok(None),
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_number<T: FromStr>(&self, value: &str) -> Result<Option<T>, ConfigFileError>
    where
        T::Err: fmt::Display,
    {
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
