//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup to route them to stderr and, optionally, a log file.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file or its directory could not be created.
    #[error("failed to open log file {}: {source}", .path.display())]
    LogFile { path: PathBuf, source: io::Error },

    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level shown when `RUST_LOG` is not set.
    pub level: Level,
    /// Also append plain-text logs to this file.
    pub log_file: Option<PathBuf>,
    /// Use ANSI colors on stderr.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a config from a `-v` count.
    ///
    /// - 0: info
    /// - 1: debug
    /// - 2+: trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set the level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the log file.
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Parse a level name as used in the config file.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Keeps the file writer alive. Buffered lines are flushed on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_env_filter(config.level);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .with_timer(LocalTime::new(Rfc3339));

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("launchkit={level},launchkit_cli={level},warn"))
    })
}

/// Open the log file for appending, creating its directory.
fn open_log_file(path: &Path) -> Result<fs::File, LoggingError> {
    let log_err = |e: io::Error| LoggingError::LogFile {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(log_err)?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_err)
}
