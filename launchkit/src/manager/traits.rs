//! Collaborator interfaces used by the installer.
//!
//! The orchestrator depends only on these traits, so each I/O boundary
//! (release API, HTTP transfer, external extractor) can be replaced in tests.

use std::path::Path;

use super::download::PercentCallback;
use super::error::ManagerResult;
use super::release::ReleaseAsset;

/// Looks up the downloadable assets of a tagged release.
pub trait ReleaseClient: Send + Sync {
    /// Resolve `owner/repo@tag` to its asset list.
    fn release_assets(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        token: Option<&str>,
    ) -> ManagerResult<Vec<ReleaseAsset>>;
}

/// Downloads a single URL to a file.
pub trait ContentFetcher: Send + Sync {
    /// Download `url` to `dest`, reporting whole-percent progress.
    ///
    /// Implementations must never leave partial content at `dest`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
        on_progress: PercentCallback<'_>,
    ) -> ManagerResult<u64>;
}

/// Extracts a (possibly multi-volume) archive with an external tool.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest_dir` using the tool at `executable`.
    ///
    /// Every output line of the tool is passed to `on_output` as it arrives.
    fn extract(
        &self,
        executable: &Path,
        archive: &Path,
        dest_dir: &Path,
        on_output: &dyn Fn(&str),
    ) -> ManagerResult<()>;
}
