//! Free disk space pre-check.
//!
//! Parts are stored next to the install and the archive is stored without
//! compression, so the extracted client needs about as much room again as
//! the download. A fixed margin on top absorbs filesystem overhead.

use std::path::Path;

use super::error::{ManagerError, ManagerResult};
use super::release::ReleaseAsset;

/// Default headroom required beyond download and extracted size (1 GiB).
pub const DEFAULT_SPACE_MARGIN: u64 = 1024 * 1024 * 1024;

/// Bytes an install is expected to need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceEstimate {
    /// Parts still to be downloaded.
    pub download_bytes: u64,
    /// Extracted client size, estimated as the total size of all parts.
    pub extracted_bytes: u64,
    /// Fixed headroom.
    pub margin: u64,
}

impl SpaceEstimate {
    /// Estimate the space needed for `parts`.
    ///
    /// A part already present in `download_dir` with its advertised size
    /// is not counted as a download.
    pub fn for_parts(parts: &[ReleaseAsset], download_dir: &Path, margin: u64) -> Self {
        let mut download_bytes = 0u64;
        let mut extracted_bytes = 0u64;

        for part in parts {
            extracted_bytes = extracted_bytes.saturating_add(part.size);
            let on_disk = std::fs::metadata(download_dir.join(&part.name))
                .map(|m| m.is_file() && m.len() == part.size)
                .unwrap_or(false);
            if !on_disk {
                download_bytes = download_bytes.saturating_add(part.size);
            }
        }

        Self {
            download_bytes,
            extracted_bytes,
            margin,
        }
    }

    /// Total bytes that must be free.
    pub fn required(&self) -> u64 {
        self.download_bytes
            .saturating_add(self.extracted_bytes)
            .saturating_add(self.margin)
    }

    /// Fail with [`ManagerError::InsufficientSpace`] when `available` is short.
    pub fn ensure_fits(&self, path: &Path, available: u64) -> ManagerResult<()> {
        let required = self.required();
        if available < required {
            return Err(ManagerError::InsufficientSpace {
                path: path.to_path_buf(),
                required,
                available,
            });
        }
        Ok(())
    }
}

/// Bytes available to the current user on the volume holding `path`.
pub fn available_space(path: &Path) -> std::io::Result<u64> {
    fs4::available_space(path)
}
