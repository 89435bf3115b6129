//! Archive extraction through an external 7-Zip compatible tool.
//!
//! This module handles:
//! - Running the extractor against the first volume of a split archive
//! - Streaming the tool's stdout/stderr line by line while it runs
//! - Checking that extraction actually produced content

use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, warn};

use super::error::{ManagerError, ManagerResult};
use super::traits::ArchiveExtractor;

/// Extractor driving a `7z`/`7za` executable.
///
/// The tool locates the remaining volumes (`.002`, `.003`, ...) next to the
/// first one by itself.
#[derive(Debug, Default)]
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Create a new 7-Zip extractor.
    pub fn new() -> Self {
        Self
    }

    /// Command-line arguments for extracting `archive` into `dest_dir`.
    ///
    /// `x` keeps directory structure, `-y` answers every prompt, and
    /// `-bso1 -bse1` route normal and error output to the piped streams.
    pub fn command_args(archive: &Path, dest_dir: &Path) -> Vec<OsString> {
        let mut output_flag = OsString::from("-o");
        output_flag.push(dest_dir);

        vec![
            OsString::from("x"),
            archive.as_os_str().to_os_string(),
            output_flag,
            OsString::from("-y"),
            OsString::from("-bso1"),
            OsString::from("-bse1"),
        ]
    }
}

impl ArchiveExtractor for SevenZipExtractor {
    fn extract(
        &self,
        executable: &Path,
        archive: &Path,
        dest_dir: &Path,
        on_output: &dyn Fn(&str),
    ) -> ManagerResult<()> {
        debug!(
            exe = %executable.display(),
            archive = %archive.display(),
            dest = %dest_dir.display(),
            "starting extractor"
        );

        let mut child = Command::new(executable)
            .args(Self::command_args(archive, dest_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ManagerError::ExtractorSpawnFailed {
                path: executable.to_path_buf(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            readers.push(thread::spawn(move || forward_lines(stdout, &tx)));
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            readers.push(thread::spawn(move || forward_lines(stderr, &tx)));
        }
        drop(tx);

        // Ends once both readers hit EOF and drop their senders
        for line in rx {
            on_output(&line);
        }

        for reader in readers {
            if reader.join().is_err() {
                warn!("extractor output reader panicked");
            }
        }

        let status = child.wait().map_err(|e| ManagerError::ExtractorSpawnFailed {
            path: executable.to_path_buf(),
            reason: format!("failed to wait for extractor: {}", e),
        })?;

        match status.code() {
            Some(0) => Ok(()),
            code => Err(ManagerError::ExtractorFailed { code }),
        }
    }
}

/// Send every non-blank line of `stream` to `tx`.
///
/// Bytes are decoded lossily; the tool may print in a legacy code page.
fn forward_lines(stream: impl Read, tx: &Sender<String>) {
    for chunk in BufReader::new(stream).split(b'\n') {
        let Ok(bytes) = chunk else { break };
        let line = String::from_utf8_lossy(&bytes);
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line.to_string()).is_err() {
            break;
        }
    }
}

/// Check that extraction left real content in `install_dir`.
///
/// Entries listed in `ignore` (the version marker, a download folder nested
/// in the install directory) do not count. The directory must hold at least
/// one other entry, and if that single entry is a directory it must not be
/// empty itself.
pub fn validate_extraction(install_dir: &Path, ignore: &[PathBuf]) -> ManagerResult<()> {
    let empty = || ManagerError::EmptyExtraction {
        path: install_dir.to_path_buf(),
    };

    let entries = match fs::read_dir(install_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %install_dir.display(), error = %e, "install directory unreadable");
            return Err(empty());
        }
    };

    let items: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| !ignore.contains(path))
        .collect();

    match items.as_slice() {
        [] => Err(empty()),
        [only] if only.is_dir() => {
            let has_content = fs::read_dir(only)
                .map(|mut inner| inner.next().is_some())
                .unwrap_or(false);
            if has_content {
                Ok(())
            } else {
                Err(empty())
            }
        }
        _ => Ok(()),
    }
}

/// Count regular files under `dir`.
///
/// Symlinks are never followed, so a link back to an ancestor cannot loop.
pub fn count_files_recursive(dir: &Path) -> ManagerResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| ManagerError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut count = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            count += 1;
        } else if file_type.is_dir() {
            count += count_files_recursive(&entry.path())?;
        }
    }

    Ok(count)
}
