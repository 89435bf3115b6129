//! Error types for the client installer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for installer operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Broad category of an installer failure.
///
/// Callers (and tests) use this to tell apart the step at which a run failed
/// without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was incomplete or the extractor is missing.
    Configuration,
    /// The release, its parts, or its manifest could not be found.
    Discovery,
    /// The checksum manifest held no usable entries.
    Manifest,
    /// A digest was missing or did not match.
    Integrity,
    /// A download failed.
    Transfer,
    /// The external extractor failed.
    Extraction,
    /// Extraction produced no content.
    Validation,
    /// Local filesystem operation failed.
    Filesystem,
    /// Not enough free disk space for the install.
    Space,
}

impl ErrorKind {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Discovery => "discovery",
            Self::Manifest => "manifest",
            Self::Integrity => "integrity",
            Self::Transfer => "transfer",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Filesystem => "filesystem",
            Self::Space => "disk space",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while installing the game client.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Invalid or incomplete install request.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The extractor executable does not exist.
    #[error("extractor not found at {}", .path.display())]
    ExtractorNotFound { path: PathBuf },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The release lookup returned a non-success status.
    #[error("release lookup failed with HTTP {status}: {body}")]
    ReleaseLookupFailed { status: u16, body: String },

    /// The release lookup could not be performed.
    #[error("failed to query release {url}: {reason}")]
    ReleaseRequestFailed { url: String, reason: String },

    /// The release metadata could not be parsed.
    #[error("failed to parse release metadata: {0}")]
    ReleaseParseFailed(String),

    /// The release has no multi-part archive assets.
    #[error("release {tag} contains no archive parts (*.7z.001 ...)")]
    NoPartAssets { tag: String },

    /// The release has no checksum manifest asset.
    #[error("release does not contain {name}")]
    ManifestAssetMissing { name: String },

    /// The checksum manifest produced no valid entries.
    #[error("manifest empty or invalid")]
    ManifestEmpty,

    /// No expected digest exists for an asset.
    #[error("no expected hash for {asset}")]
    MissingDigest { asset: String },

    /// Checksum verification failed.
    #[error("hash mismatch for {filename}: expected={expected} actual={actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// A download ended with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus { status: u16, url: String },

    /// A download followed too many redirects.
    #[error("too many redirects ({limit}) fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    /// A download failed at the transport level.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// An asset could not be downloaded within the retry budget.
    #[error("failed downloading {asset} after {attempts} attempts: {source}")]
    TransferExhausted {
        asset: String,
        attempts: u32,
        #[source]
        source: Box<ManagerError>,
    },

    /// The extractor process could not be started.
    #[error("failed to start extractor {}: {reason}", .path.display())]
    ExtractorSpawnFailed { path: PathBuf, reason: String },

    /// The extractor exited unsuccessfully.
    #[error("extractor exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ExtractorFailed { code: Option<i32> },

    /// The install volume does not have enough free space.
    #[error(
        "not enough disk space in {}: {required} bytes required, {available} available",
        .path.display()
    )]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    /// Extraction left the install directory empty.
    #[error("extraction produced no files in {}", .path.display())]
    EmptyExtraction { path: PathBuf },
}

impl ManagerError {
    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) | Self::ExtractorNotFound { .. } => ErrorKind::Configuration,
            Self::ReadFailed { .. } | Self::WriteFailed { .. } | Self::CreateDirFailed { .. } => {
                ErrorKind::Filesystem
            }
            Self::ReleaseLookupFailed { .. }
            | Self::ReleaseRequestFailed { .. }
            | Self::ReleaseParseFailed(_)
            | Self::NoPartAssets { .. }
            | Self::ManifestAssetMissing { .. } => ErrorKind::Discovery,
            Self::ManifestEmpty => ErrorKind::Manifest,
            Self::MissingDigest { .. } | Self::ChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::HttpStatus { .. }
            | Self::TooManyRedirects { .. }
            | Self::DownloadFailed { .. }
            | Self::TransferExhausted { .. } => ErrorKind::Transfer,
            Self::ExtractorSpawnFailed { .. } | Self::ExtractorFailed { .. } => {
                ErrorKind::Extraction
            }
            Self::EmptyExtraction { .. } => ErrorKind::Validation,
            Self::InsufficientSpace { .. } => ErrorKind::Space,
        }
    }
}
