//! Client installer: release lookup through version marker.
//!
//! This module orchestrates the full installation workflow:
//! 1. Skip immediately when the requested version is already installed
//! 2. Look up the release and select its archive parts
//! 3. Download and parse the checksum manifest
//! 4. Reuse parts already on disk with a matching digest, download the rest
//! 5. Verify every part
//! 6. Extract the first part with the external tool and check the result
//! 7. Write the version marker
//! 8. Clean up parts and manifest
//!
//! A failure at any step aborts the run. Parts are left in place when
//! extraction fails so they can be inspected and reused on the next run.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::warn;

use super::config::{InstallRequest, DOWNLOADS_DIRNAME};
use super::download::{calculate_file_checksum, verify_checksum, HttpFetcher};
use super::error::{ManagerError, ManagerResult};
use super::extractor::{count_files_recursive, validate_extraction, SevenZipExtractor};
use super::local::{VersionMarkerStore, MARKER_FILENAME};
use super::manifest::{ChecksumManifest, MANIFEST_FILENAME};
use super::observer::{InstallObserver, Reporter};
use super::parts::{find_manifest_asset, select_parts};
use super::release::{GitHubReleaseClient, ReleaseAsset};
use super::space::{available_space, SpaceEstimate};
use super::traits::{ArchiveExtractor, ContentFetcher, ReleaseClient};

/// Installation stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Checking the installed version marker.
    CheckSkip,
    /// Querying the release metadata.
    FetchRelease,
    /// Picking the archive parts.
    SelectParts,
    /// Checking free disk space.
    CheckSpace,
    /// Downloading the checksum manifest.
    FetchManifest,
    /// Reusing or downloading each part.
    ReconcileParts,
    /// Verifying every part.
    VerifyAll,
    /// Running the extractor.
    Extract,
    /// Checking the extracted content.
    ValidateExtraction,
    /// Writing the version marker.
    PersistMarker,
    /// Removing parts and manifest.
    Cleanup,
    /// Installation complete.
    Done,
}

impl InstallStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckSkip => "Checking installed version",
            Self::FetchRelease => "Fetching release",
            Self::SelectParts => "Selecting parts",
            Self::CheckSpace => "Checking disk space",
            Self::FetchManifest => "Fetching manifest",
            Self::ReconcileParts => "Downloading",
            Self::VerifyAll => "Verifying",
            Self::ValidateExtraction => "Validating extraction",
            Self::Extract => "Extracting",
            Self::PersistMarker => "Recording version",
            Self::Cleanup => "Cleaning up",
            Self::Done => "Complete",
        }
    }
}

/// Result of a successful install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// True when the version was already installed and nothing was done.
    pub skipped: bool,
    /// Installed release tag.
    pub version: String,
    /// Directory the client lives in.
    pub install_dir: PathBuf,
    /// Parts fetched over the network during this run.
    pub parts_downloaded: usize,
    /// Parts found on disk with a matching digest.
    pub parts_reused: usize,
    /// Bytes written by part downloads.
    pub bytes_downloaded: u64,
}

impl InstallOutcome {
    fn skipped(request: &InstallRequest) -> Self {
        Self {
            skipped: true,
            version: request.version().to_string(),
            install_dir: request.install_dir.clone(),
            parts_downloaded: 0,
            parts_reused: 0,
            bytes_downloaded: 0,
        }
    }
}

/// A part with its expected digest and local path.
struct PlannedPart<'a> {
    asset: &'a ReleaseAsset,
    expected: String,
    path: PathBuf,
}

/// Client installer.
///
/// Handles the complete installation workflow. The three I/O boundaries are
/// injected so each can be replaced independently.
pub struct ClientInstaller<R = GitHubReleaseClient, F = HttpFetcher, X = SevenZipExtractor>
where
    R: ReleaseClient,
    F: ContentFetcher,
    X: ArchiveExtractor,
{
    releases: R,
    fetcher: F,
    extractor: X,
}

impl ClientInstaller {
    /// Create an installer using GitHub, HTTP and 7-Zip, configured from
    /// the request's API root and timeout.
    pub fn new(request: &InstallRequest) -> ManagerResult<Self> {
        Ok(Self::with_components(
            GitHubReleaseClient::with_api_base(&request.api_base_url)?,
            HttpFetcher::with_timeout(request.timeout)?,
            SevenZipExtractor::new(),
        ))
    }
}

impl<R, F, X> ClientInstaller<R, F, X>
where
    R: ReleaseClient,
    F: ContentFetcher,
    X: ArchiveExtractor,
{
    /// Create an installer from explicit components.
    pub fn with_components(releases: R, fetcher: F, extractor: X) -> Self {
        Self {
            releases,
            fetcher,
            extractor,
        }
    }

    /// Install the release described by `request`.
    ///
    /// Running again with the same request after success returns a skipped
    /// outcome without touching the network.
    pub fn install(
        &self,
        request: &InstallRequest,
        observer: &dyn InstallObserver,
    ) -> ManagerResult<InstallOutcome> {
        let report = Reporter::new(observer);
        let result = self.run(request, report);
        if let Err(e) = &result {
            report.log(&format!("Install failed ({}): {}", e.kind(), e));
        }
        result
    }

    fn run(&self, request: &InstallRequest, report: Reporter<'_>) -> ManagerResult<InstallOutcome> {
        request.validate()?;
        let version = request.version();
        let marker = VersionMarkerStore::new(&request.install_dir);

        report.stage(InstallStage::CheckSkip);
        if request.skip_if_version_installed && marker.is_installed(version) {
            report.log(&format!(
                "Version {} already installed in {}",
                version,
                request.install_dir.display()
            ));
            report.stage(InstallStage::Done);
            return Ok(InstallOutcome::skipped(request));
        }

        ensure_dir(&request.download_dir)?;
        ensure_dir(&request.install_dir)?;

        // Release lookup
        report.stage(InstallStage::FetchRelease);
        report.log(&format!(
            "Fetching release {}/{}@{}",
            request.owner, request.repo, version
        ));
        let assets =
            self.releases
                .release_assets(&request.owner, &request.repo, version, request.token())?;

        report.stage(InstallStage::SelectParts);
        let parts = select_parts(&assets);
        if parts.is_empty() {
            return Err(ManagerError::NoPartAssets {
                tag: version.to_string(),
            });
        }
        let manifest_asset =
            find_manifest_asset(&assets).ok_or_else(|| ManagerError::ManifestAssetMissing {
                name: MANIFEST_FILENAME.to_string(),
            })?;
        report.log(&format!(
            "Found {} parts: {}",
            parts.len(),
            parts
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        if let Some(margin) = request.space_margin {
            report.stage(InstallStage::CheckSpace);
            self.check_space(&parts, margin, request, report)?;
        }

        // Checksums
        report.stage(InstallStage::FetchManifest);
        let manifest_path = request.download_dir.join(&manifest_asset.name);
        self.fetch_with_retry(manifest_asset, &manifest_path, request, report)?;
        let manifest_bytes = fs::read(&manifest_path).map_err(|e| ManagerError::ReadFailed {
            path: manifest_path.clone(),
            source: e,
        })?;
        let manifest = ChecksumManifest::from_bytes(&manifest_bytes)?;
        report.log(&format!("Manifest lists {} entries", manifest.len()));

        let plan = plan_parts(&parts, &manifest, &request.download_dir)?;

        // Reconcile local state
        report.stage(InstallStage::ReconcileParts);
        let mut outcome = InstallOutcome {
            skipped: false,
            version: version.to_string(),
            install_dir: request.install_dir.clone(),
            parts_downloaded: 0,
            parts_reused: 0,
            bytes_downloaded: 0,
        };

        for part in &plan {
            if self.is_reusable(part, report) {
                report.log(&format!("{} already downloaded and verified", part.asset.name));
                report.progress(&part.asset.name, 100);
                outcome.parts_reused += 1;
                continue;
            }

            outcome.bytes_downloaded += self.fetch_with_retry(part.asset, &part.path, request, report)?;
            outcome.parts_downloaded += 1;
        }

        report.stage(InstallStage::VerifyAll);
        for part in &plan {
            verify_checksum(&part.path, &part.expected)?;
        }
        report.log(&format!("All {} parts verified", plan.len()));

        // Extraction
        report.stage(InstallStage::Extract);
        let first = &plan[0].path;
        report.log(&format!(
            "Extracting {} into {}",
            first.display(),
            request.install_dir.display()
        ));
        self.extractor
            .extract(
                &request.extractor_path,
                first,
                &request.install_dir,
                &|line: &str| report.log(line),
            )
            .map_err(|e| keep_parts(e, &request.download_dir, report))?;

        report.stage(InstallStage::ValidateExtraction);
        validate_extraction(&request.install_dir, &validation_ignores(request))
            .map_err(|e| keep_parts(e, &request.download_dir, report))?;
        if let Ok(count) = count_files_recursive(&request.install_dir) {
            report.log(&format!("Extraction complete ({} files)", count));
        }

        report.stage(InstallStage::PersistMarker);
        marker.write(version)?;

        if request.cleanup_parts {
            report.stage(InstallStage::Cleanup);
            report.log("Removing downloaded parts");
            let mut files: Vec<PathBuf> = plan.iter().map(|p| p.path.clone()).collect();
            files.push(manifest_path);
            cleanup(&request.install_dir, &request.download_dir, &files, report);
        }

        report.stage(InstallStage::Done);
        report.log(&format!(
            "Client {} installed in {}",
            version,
            request.install_dir.display()
        ));

        Ok(outcome)
    }

    /// Refuse to start when the install volume cannot hold the parts plus
    /// the extracted client.
    ///
    /// An unreadable free-space figure is logged and the install proceeds.
    fn check_space(
        &self,
        parts: &[ReleaseAsset],
        margin: u64,
        request: &InstallRequest,
        report: Reporter<'_>,
    ) -> ManagerResult<()> {
        let estimate = SpaceEstimate::for_parts(parts, &request.download_dir, margin);
        let available = match available_space(&request.install_dir) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %request.install_dir.display(), error = %e, "free space unknown");
                report.log("Could not determine free disk space, continuing");
                return Ok(());
            }
        };

        report.log(&format!(
            "Disk space: {} bytes required ({} download, {} extracted, {} margin), {} free",
            estimate.required(),
            estimate.download_bytes,
            estimate.extracted_bytes,
            estimate.margin,
            available
        ));
        estimate.ensure_fits(&request.install_dir, available)
    }

    /// Whether the file already on disk matches its expected digest.
    ///
    /// A mismatching file is deleted so it is downloaded fresh.
    fn is_reusable(&self, part: &PlannedPart<'_>, report: Reporter<'_>) -> bool {
        if !part.path.is_file() {
            return false;
        }

        match calculate_file_checksum(&part.path) {
            Ok(actual) if actual == part.expected => true,
            Ok(_) => {
                report.log(&format!(
                    "{} is corrupt or incomplete, downloading again",
                    part.asset.name
                ));
                if let Err(e) = fs::remove_file(&part.path) {
                    warn!(path = %part.path.display(), error = %e, "failed to remove corrupt part");
                }
                false
            }
            Err(e) => {
                warn!(path = %part.path.display(), error = %e, "failed to hash existing part");
                false
            }
        }
    }

    /// Download one asset, retrying with linear back-off.
    fn fetch_with_retry(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
        request: &InstallRequest,
        report: Reporter<'_>,
    ) -> ManagerResult<u64> {
        let policy = request.retry;
        let on_progress = |pct: u8| report.progress(&asset.name, pct);
        let mut failures = 0u32;

        loop {
            if failures > 0 {
                thread::sleep(policy.delay_after(failures));
            }

            report.log(&format!(
                "Downloading {} (attempt {}/{})",
                asset.name,
                failures + 1,
                policy.max_attempts
            ));

            match self
                .fetcher
                .fetch(&asset.download_url, dest, request.token(), &on_progress)
            {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    failures += 1;
                    report.log(&format!("Download of {} failed: {}", asset.name, e));
                    if failures >= policy.max_attempts {
                        return Err(ManagerError::TransferExhausted {
                            asset: asset.name.clone(),
                            attempts: failures,
                            source: Box::new(e),
                        });
                    }
                }
            }
        }
    }
}

/// Install using the default GitHub, HTTP and 7-Zip components.
pub fn install_client(
    request: &InstallRequest,
    observer: &dyn InstallObserver,
) -> ManagerResult<InstallOutcome> {
    ClientInstaller::new(request)?.install(request, observer)
}

/// Pair each part with its manifest digest, failing on the first gap.
fn plan_parts<'a>(
    parts: &'a [ReleaseAsset],
    manifest: &ChecksumManifest,
    download_dir: &Path,
) -> ManagerResult<Vec<PlannedPart<'a>>> {
    parts
        .iter()
        .map(|asset| {
            let expected = manifest
                .get(&asset.name)
                .ok_or_else(|| ManagerError::MissingDigest {
                    asset: asset.name.clone(),
                })?;
            Ok(PlannedPart {
                asset,
                expected: expected.to_string(),
                path: download_dir.join(&asset.name),
            })
        })
        .collect()
}

/// Entries of the install directory that are not extracted content.
fn validation_ignores(request: &InstallRequest) -> Vec<PathBuf> {
    let mut ignore = vec![request.install_dir.join(MARKER_FILENAME)];
    if let Ok(relative) = request.download_dir.strip_prefix(&request.install_dir) {
        if let Some(top) = relative.components().next() {
            ignore.push(request.install_dir.join(top));
        }
    }
    ignore
}

fn keep_parts(e: ManagerError, download_dir: &Path, report: Reporter<'_>) -> ManagerError {
    report.log(&format!(
        "Keeping downloaded parts in {} for diagnosis",
        download_dir.display()
    ));
    e
}

/// Best-effort removal of parts, manifest and an emptied download folder.
///
/// The shared `<install_dir>/_downloads` root goes too once nothing is left in it.
fn cleanup(install_dir: &Path, download_dir: &Path, files: &[PathBuf], report: Reporter<'_>) {
    for path in files {
        if !path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "cleanup failed");
            report.log(&format!("Could not remove {}: {}", path.display(), e));
        }
    }

    remove_dir_if_empty(download_dir);

    let staging_root = install_dir.join(DOWNLOADS_DIRNAME);
    if download_dir.parent() == Some(staging_root.as_path()) {
        remove_dir_if_empty(&staging_root);
    }
}

fn remove_dir_if_empty(dir: &Path) {
    let is_empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(e) = fs::remove_dir(dir) {
            warn!(path = %dir.display(), error = %e, "failed to remove download directory");
        }
    }
}

fn ensure_dir(dir: &Path) -> ManagerResult<()> {
    fs::create_dir_all(dir).map_err(|e| ManagerError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}
