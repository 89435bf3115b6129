//! CLI error type and exit codes.

use std::fmt;
use std::process;

use launchkit::config::ConfigFileError;
use launchkit::logging::LoggingError;
use launchkit::manager::{ErrorKind, ManagerError};

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),
    /// The install pipeline failed.
    Install(ManagerError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The install worker thread died.
    Worker(String),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Install failures map their category to a distinct code so scripts can
    /// tell a bad checksum from a network outage.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Logging(_) | CliError::Worker(_) => 1,
            CliError::Install(e) => match e.kind() {
                ErrorKind::Configuration => 2,
                ErrorKind::Discovery => 3,
                ErrorKind::Manifest | ErrorKind::Integrity => 4,
                ErrorKind::Transfer => 5,
                ErrorKind::Extraction | ErrorKind::Validation => 6,
                ErrorKind::Filesystem => 7,
                ErrorKind::Space => 8,
            },
        }
    }

    /// Print the error and exit.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Install(e) => write!(f, "{} error: {}", e.kind(), e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Worker(msg) => write!(f, "install worker failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        match e {
            ManagerError::InvalidConfig(msg) => CliError::Config(msg),
            other => CliError::Install(other),
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
