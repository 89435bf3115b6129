//! HTTP-based file fetcher with bounded redirect following.
//!
//! This module provides the core HTTP download functionality:
//! - Manual redirect handling (301/302/303/307/308), relative `Location` supported
//! - Streaming to a `.part` sibling that is promoted only after a clean close
//! - Whole-percent progress callbacks when the content length is known

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Url;
use tracing::{debug, warn};

use super::progress::{PercentCallback, PercentTracker};
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::traits::ContentFetcher;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Maximum number of redirects followed for a single download.
pub const MAX_REDIRECTS: usize = 8;

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Suffix of the temporary file a body is streamed into.
const TEMP_SUFFIX: &str = ".part";

/// Status codes treated as redirects.
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

pub(crate) const USER_AGENT: &str = concat!("launchkit/", env!("CARGO_PKG_VERSION"));

/// HTTP-based content fetcher.
///
/// The underlying client never follows redirects on its own; every hop is
/// resolved here so the chain length stays bounded.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings.
    pub fn new() -> ManagerResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> ManagerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ManagerError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    /// Issue the GET request and follow redirects until a terminal response.
    ///
    /// The bearer token is only sent while the request stays on the origin
    /// host of `url`.
    fn open(&self, url: &str, token: Option<&str>) -> ManagerResult<Response> {
        let origin = Url::parse(url).map_err(|e| ManagerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("invalid URL: {}", e),
        })?;

        let mut current = origin.clone();
        let mut redirects = 0;

        loop {
            let mut request = self
                .client
                .get(current.clone())
                .header(ACCEPT, "application/octet-stream");
            if let Some(token) = token.filter(|_| same_origin(&origin, &current)) {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .map_err(|e| self.transport_error(current.as_str(), &e))?;

            let status = response.status();
            if REDIRECT_STATUSES.contains(&status.as_u16()) {
                if let Some(next) = redirect_target(&current, &response) {
                    if redirects == MAX_REDIRECTS {
                        return Err(ManagerError::TooManyRedirects {
                            url: url.to_string(),
                            limit: MAX_REDIRECTS,
                        });
                    }
                    redirects += 1;
                    debug!(from = %current, to = %next, status = status.as_u16(), "following redirect");
                    current = next;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(ManagerError::HttpStatus {
                    status: status.as_u16(),
                    url: current.to_string(),
                });
            }

            return Ok(response);
        }
    }

    fn transport_error(&self, url: &str, e: &reqwest::Error) -> ManagerError {
        let reason = if e.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs())
        } else {
            e.to_string()
        };
        ManagerError::DownloadFailed {
            url: url.to_string(),
            reason,
        }
    }

    /// Stream the body into the temp file, then promote it to `dest`.
    fn stream_to_file(
        &self,
        response: Response,
        dest: &Path,
        on_progress: PercentCallback<'_>,
    ) -> ManagerResult<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let tmp = temp_path(dest);
        let written = write_body(response, &tmp, on_progress)
            .and_then(|bytes| promote(&tmp, dest).map(|_| bytes));

        if written.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %e, "failed to remove partial download");
            }
        }

        written
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
        on_progress: PercentCallback<'_>,
    ) -> ManagerResult<u64> {
        let response = self.open(url, token)?;
        self.stream_to_file(response, dest, on_progress)
    }
}

/// Path of the temporary sibling used while `dest` is downloading.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    dest.with_file_name(name)
}

/// Whether two URLs share scheme, host and port.
pub(crate) fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

fn write_body(
    mut response: Response,
    tmp: &Path,
    on_progress: PercentCallback<'_>,
) -> ManagerResult<u64> {
    let url = response.url().to_string();
    let file = File::create(tmp).map_err(|e| ManagerError::WriteFailed {
        path: tmp.to_path_buf(),
        source: e,
    })?;

    let mut tracker = PercentTracker::new(response.content_length());
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| ManagerError::DownloadFailed {
                url: url.clone(),
                reason: format!("read error: {}", e),
            })?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| ManagerError::WriteFailed {
                path: tmp.to_path_buf(),
                source: e,
            })?;

        if let Some(pct) = tracker.advance(bytes_read as u64) {
            on_progress(pct);
        }
    }

    let file = writer.into_inner().map_err(|e| ManagerError::WriteFailed {
        path: tmp.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|e| ManagerError::WriteFailed {
        path: tmp.to_path_buf(),
        source: e,
    })?;

    Ok(tracker.bytes_done())
}

/// Move the finished temp file into place.
///
/// Falls back to copy + delete when a rename is not possible.
fn promote(tmp: &Path, dest: &Path) -> ManagerResult<()> {
    if fs::rename(tmp, dest).is_ok() {
        return Ok(());
    }

    fs::copy(tmp, dest).map_err(|e| ManagerError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;
    fs::remove_file(tmp).map_err(|e| ManagerError::WriteFailed {
        path: tmp.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(fetcher.timeout.as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_http_fetcher_with_timeout() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(fetcher.timeout.as_secs(), 60);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let dest = Path::new("/downloads/v1.0.0/client.7z.001");
        assert_eq!(
            temp_path(dest),
            PathBuf::from("/downloads/v1.0.0/client.7z.001.part")
        );
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("https://github.com/owner/repo/releases/download/v1/a.7z.001").unwrap();
        let b = Url::parse("https://github.com/other/path").unwrap();
        let c = Url::parse("https://objects.githubusercontent.com/a").unwrap();
        let d = Url::parse("http://github.com/owner").unwrap();

        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &c));
        assert!(!same_origin(&a, &d));
    }

    #[test]
    fn test_invalid_url_is_transfer_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch("not a url", &temp.path().join("x"), None, &|_| {});
        assert!(matches!(result, Err(ManagerError::DownloadFailed { .. })));
    }

    #[test]
    fn test_promote_replaces_existing_destination() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("SHA256SUMS.txt");
        let tmp = temp_path(&dest);
        fs::write(&dest, b"stale").unwrap();
        fs::write(&tmp, b"fresh").unwrap();

        promote(&tmp, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"fresh");
        assert!(!tmp.exists());
    }
}
