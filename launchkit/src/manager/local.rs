//! Installed version marker.
//!
//! A small text file inside the install directory records which release tag
//! was last installed successfully. Its presence with a matching tag lets a
//! later run skip all work.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ManagerError, ManagerResult};

/// Filename of the version marker inside the install directory.
///
/// Shared with installs made by the earlier launcher, so the spelling stays.
pub const MARKER_FILENAME: &str = "CLIENTE_VERSION.txt";

/// Reads and writes the version marker of one install directory.
#[derive(Debug, Clone)]
pub struct VersionMarkerStore {
    install_dir: PathBuf,
}

impl VersionMarkerStore {
    /// Create a store for the given install directory.
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    /// Full path of the marker file.
    pub fn path(&self) -> PathBuf {
        self.install_dir.join(MARKER_FILENAME)
    }

    /// Read the installed tag.
    ///
    /// Returns `None` when the marker is missing, unreadable or blank.
    pub fn read(&self) -> Option<String> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let tag = contents.trim();
                (!tag.is_empty()).then(|| tag.to_string())
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no version marker");
                None
            }
        }
    }

    /// Whether the marker records exactly `tag` (after trimming both).
    pub fn is_installed(&self, tag: &str) -> bool {
        self.read().as_deref() == Some(tag.trim())
    }

    /// Replace the marker with `tag`, terminated by CRLF.
    pub fn write(&self, tag: &str) -> ManagerResult<()> {
        ensure_dir(&self.install_dir)?;
        let path = self.path();
        fs::write(&path, format!("{}\r\n", tag.trim()))
            .map_err(|e| ManagerError::WriteFailed { path, source: e })
    }
}

fn ensure_dir(dir: &Path) -> ManagerResult<()> {
    fs::create_dir_all(dir).map_err(|e| ManagerError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_marker() {
        let temp = TempDir::new().unwrap();
        let store = VersionMarkerStore::new(temp.path());
        assert_eq!(store.read(), None);
        assert!(!store.is_installed("v1.0.0"));
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = VersionMarkerStore::new(temp.path());

        store.write("  v1.0.0 \n").unwrap();

        let raw = fs::read(store.path()).unwrap();
        assert_eq!(raw, b"v1.0.0\r\n");
        assert_eq!(store.read().as_deref(), Some("v1.0.0"));
        assert!(store.is_installed("v1.0.0"));
        assert!(store.is_installed(" v1.0.0 "));
        assert!(!store.is_installed("v1.0.1"));
    }

    #[test]
    fn test_reads_marker_left_by_earlier_launcher() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLIENTE_VERSION.txt"), b"v2.4.0\r\n").unwrap();

        let store = VersionMarkerStore::new(temp.path());
        assert_eq!(store.path(), temp.path().join("CLIENTE_VERSION.txt"));
        assert!(store.is_installed("v2.4.0"));
    }

    #[test]
    fn test_write_creates_install_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("games").join("client");
        let store = VersionMarkerStore::new(&dir);

        store.write("v2").unwrap();

        assert!(dir.join(MARKER_FILENAME).is_file());
    }

    #[test]
    fn test_write_replaces_previous_tag() {
        let temp = TempDir::new().unwrap();
        let store = VersionMarkerStore::new(temp.path());
        store.write("v1.0.0-long-prerelease").unwrap();
        store.write("v1").unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "v1\r\n");
    }

    #[test]
    fn test_blank_marker_reads_as_none() {
        let temp = TempDir::new().unwrap();
        let store = VersionMarkerStore::new(temp.path());
        fs::write(store.path(), " \r\n").unwrap();
        assert_eq!(store.read(), None);
    }
}
