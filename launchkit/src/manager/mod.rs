//! Release-based client installer.
//!
//! Installs a game client published as a multi-part 7z archive on a release
//! host, with a `SHA256SUMS.txt` manifest alongside the parts.
//!
//! # Overview
//!
//! ```text
//! InstallRequest ──► ClientInstaller::install
//!                        │
//!                        ├── VersionMarkerStore   already installed? → skip
//!                        ├── ReleaseClient        tag → assets
//!                        ├── select_parts         *.7z.NNN, numeric order
//!                        ├── SpaceEstimate        enough free disk?
//!                        ├── ChecksumManifest     SHA256SUMS.txt
//!                        ├── ContentFetcher       missing / corrupt parts
//!                        ├── calculate_file_checksum
//!                        ├── ArchiveExtractor     7z x first part
//!                        ├── validate_extraction
//!                        └── VersionMarkerStore   write tag
//! ```
//!
//! Output goes through an [`InstallObserver`]; nothing here prints.
//!
//! # Example
//!
//! ```no_run
//! use launchkit::manager::{install_client, InstallRequest, NullObserver};
//!
//! let request = InstallRequest::new(
//!     "acme",
//!     "game-client",
//!     "v1.0.0",
//!     "/games/client",
//!     "/usr/bin/7za",
//! );
//! let outcome = install_client(&request, &NullObserver)?;
//! println!("installed {}", outcome.version);
//! # Ok::<(), launchkit::manager::ManagerError>(())
//! ```

mod config;
mod download;
mod error;
mod extractor;
mod installer;
mod local;
mod manifest;
mod observer;
mod parts;
mod release;
mod space;
mod traits;

pub use config::{
    default_download_dir, InstallRequest, RetryPolicy, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETRY_DELAY, DOWNLOADS_DIRNAME,
};
pub use download::{
    calculate_file_checksum, temp_path, verify_checksum, HttpFetcher, PercentCallback,
    PercentTracker, DEFAULT_TIMEOUT_SECS, MAX_REDIRECTS,
};
pub use error::{ErrorKind, ManagerError, ManagerResult};
pub use extractor::{count_files_recursive, validate_extraction, SevenZipExtractor};
pub use installer::{install_client, ClientInstaller, InstallOutcome, InstallStage};
pub use local::{VersionMarkerStore, MARKER_FILENAME};
pub use manifest::{decode_text, normalize_name, ChecksumManifest, MANIFEST_FILENAME};
pub use observer::{ChannelObserver, FnObserver, InstallEvent, InstallObserver, NullObserver};
pub use parts::{compare_natural, find_manifest_asset, is_part_name, select_parts};
pub use release::{parse_release, GitHubReleaseClient, ReleaseAsset, DEFAULT_API_URL};
pub use space::{available_space, SpaceEstimate, DEFAULT_SPACE_MARGIN};
pub use traits::{ArchiveExtractor, ContentFetcher, ReleaseClient};
