//! Install request and retry policy.
//!
//! [`InstallRequest`] is the complete configuration surface of one install
//! run. It is validated at the start of every run; nothing is read from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::download::DEFAULT_TIMEOUT_SECS;
use super::error::{ManagerError, ManagerResult};
use super::release::DEFAULT_API_URL;
use super::space::DEFAULT_SPACE_MARGIN;

/// Default number of attempts per download.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between download attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// Name of the download staging folder created inside the install directory.
pub const DOWNLOADS_DIRNAME: &str = "_downloads";

/// Bounded retry with linear back-off.
///
/// Attempt `n` (1-based) is preceded by a sleep of `base_delay × (n - 1)`;
/// the first attempt starts immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay unit multiplied by the number of failures so far.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait before the retry that follows `failures` failed attempts.
    pub fn delay_after(&self, failures: u32) -> Duration {
        self.base_delay.saturating_mul(failures)
    }
}

/// Everything needed to install one release of the client.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Release repository owner.
    pub owner: String,
    /// Release repository name.
    pub repo: String,
    /// Release tag to install.
    pub tag: String,
    /// Directory holding downloaded parts and the manifest.
    pub download_dir: PathBuf,
    /// Directory the client is extracted into.
    pub install_dir: PathBuf,
    /// Path of the 7-Zip compatible extractor executable.
    pub extractor_path: PathBuf,
    /// Bearer token for the release API and downloads.
    pub auth_token: Option<String>,
    /// Delete parts and the manifest after a successful install.
    pub cleanup_parts: bool,
    /// Return early when the version marker already records `tag`.
    pub skip_if_version_installed: bool,
    /// Root of the release API.
    pub api_base_url: String,
    /// Per-download retry policy.
    pub retry: RetryPolicy,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Free space required beyond download and extracted size. `None`
    /// disables the disk space check.
    pub space_margin: Option<u64>,
}

impl InstallRequest {
    /// Create a request with default download directory and options.
    ///
    /// The download directory defaults to `<install_dir>/_downloads/<tag>` so
    /// parts are staged on the same volume as the install.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        tag: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        extractor_path: impl Into<PathBuf>,
    ) -> Self {
        let tag = tag.into();
        let install_dir = install_dir.into();
        Self {
            owner: owner.into(),
            repo: repo.into(),
            download_dir: default_download_dir(&install_dir, &tag),
            tag,
            install_dir,
            extractor_path: extractor_path.into(),
            auth_token: None,
            cleanup_parts: true,
            skip_if_version_installed: true,
            api_base_url: DEFAULT_API_URL.to_string(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            space_margin: Some(DEFAULT_SPACE_MARGIN),
        }
    }

    /// Set the download directory.
    pub fn with_download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = path.into();
        self
    }

    /// Set the bearer token. Blank tokens are ignored.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Enable or disable removal of parts after install.
    pub fn with_cleanup_parts(mut self, cleanup: bool) -> Self {
        self.cleanup_parts = cleanup;
        self
    }

    /// Enable or disable the already-installed shortcut.
    pub fn with_skip_if_installed(mut self, skip: bool) -> Self {
        self.skip_if_version_installed = skip;
        self
    }

    /// Set the release API root.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the free space margin, or disable the check with `None`.
    pub fn with_space_margin(mut self, margin: Option<u64>) -> Self {
        self.space_margin = margin;
        self
    }

    /// Token to send, if any.
    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Trimmed release tag.
    pub fn version(&self) -> &str {
        self.tag.trim()
    }

    /// Check the request before any side effect.
    ///
    /// # Errors
    ///
    /// [`ManagerError::InvalidConfig`] naming the first missing field, or
    /// [`ManagerError::ExtractorNotFound`] when the extractor is not a file.
    pub fn validate(&self) -> ManagerResult<()> {
        require_text("owner", &self.owner)?;
        require_text("repo", &self.repo)?;
        require_text("tag", &self.tag)?;
        require_path("download_dir", &self.download_dir)?;
        require_path("install_dir", &self.install_dir)?;
        require_path("extractor_path", &self.extractor_path)?;

        if self.retry.max_attempts == 0 {
            return Err(ManagerError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if !self.extractor_path.is_file() {
            return Err(ManagerError::ExtractorNotFound {
                path: self.extractor_path.clone(),
            });
        }

        Ok(())
    }
}

/// Default staging directory for a tag: `<install_dir>/_downloads/<tag>`.
pub fn default_download_dir(install_dir: &Path, tag: &str) -> PathBuf {
    install_dir.join(DOWNLOADS_DIRNAME).join(tag.trim())
}

fn require_text(field: &str, value: &str) -> ManagerResult<()> {
    if value.trim().is_empty() {
        return Err(ManagerError::InvalidConfig(format!("{} is required", field)));
    }
    Ok(())
}

fn require_path(field: &str, value: &Path) -> ManagerResult<()> {
    if value.as_os_str().is_empty() {
        return Err(ManagerError::InvalidConfig(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_with_extractor(temp: &TempDir) -> InstallRequest {
        let extractor = temp.path().join("7z.exe");
        std::fs::write(&extractor, b"").unwrap();
        InstallRequest::new("acme", "client", "v1.0.0", temp.path().join("game"), extractor)
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    }

    #[test]
    fn test_request_defaults() {
        let request = InstallRequest::new("acme", "client", " v1.0.0 ", "/games/client", "/bin/7z");
        assert_eq!(
            request.download_dir,
            PathBuf::from("/games/client/_downloads/v1.0.0")
        );
        assert!(request.cleanup_parts);
        assert!(request.skip_if_version_installed);
        assert_eq!(request.api_base_url, DEFAULT_API_URL);
        assert_eq!(request.version(), "v1.0.0");
        assert_eq!(request.token(), None);
        assert_eq!(request.space_margin, Some(DEFAULT_SPACE_MARGIN));
    }

    #[test]
    fn test_builder_pattern() {
        let request = InstallRequest::new("acme", "client", "v1", "/games/client", "/bin/7z")
            .with_download_dir("/tmp/parts")
            .with_token(Some("secret".to_string()))
            .with_cleanup_parts(false)
            .with_skip_if_installed(false)
            .with_api_base_url("http://localhost:8080")
            .with_retry(RetryPolicy::new(5, Duration::ZERO))
            .with_timeout(Duration::from_secs(10));

        assert_eq!(request.download_dir, PathBuf::from("/tmp/parts"));
        assert_eq!(request.token(), Some("secret"));
        assert!(!request.cleanup_parts);
        assert!(!request.skip_if_version_installed);
        assert_eq!(request.api_base_url, "http://localhost:8080");
        assert_eq!(request.retry.max_attempts, 5);
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let request = InstallRequest::new("a", "b", "c", "/d", "/e").with_token(Some("  ".into()));
        assert_eq!(request.token(), None);
    }

    #[test]
    fn test_validate_ok() {
        let temp = TempDir::new().unwrap();
        assert!(request_with_extractor(&temp).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        let temp = TempDir::new().unwrap();

        let mut request = request_with_extractor(&temp);
        request.owner = " ".to_string();
        match request.validate() {
            Err(ManagerError::InvalidConfig(msg)) => assert!(msg.contains("owner")),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }

        let mut request = request_with_extractor(&temp);
        request.tag = String::new();
        assert!(matches!(
            request.validate(),
            Err(ManagerError::InvalidConfig(_))
        ));

        let mut request = request_with_extractor(&temp);
        request.install_dir = PathBuf::new();
        assert!(matches!(
            request.validate(),
            Err(ManagerError::InvalidConfig(_))
        ));

        let mut request = request_with_extractor(&temp);
        request.retry.max_attempts = 0;
        assert!(matches!(
            request.validate(),
            Err(ManagerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_missing_extractor() {
        let temp = TempDir::new().unwrap();
        let request = InstallRequest::new(
            "acme",
            "client",
            "v1",
            temp.path(),
            temp.path().join("missing-7z"),
        );
        match request.validate() {
            Err(ManagerError::ExtractorNotFound { path }) => {
                assert!(path.ends_with("missing-7z"));
            }
            other => panic!("Expected ExtractorNotFound, got {:?}", other),
        }

        // A directory is not an executable
        let request = InstallRequest::new("acme", "client", "v1", temp.path(), temp.path());
        assert!(matches!(
            request.validate(),
            Err(ManagerError::ExtractorNotFound { .. })
        ));
    }
}
