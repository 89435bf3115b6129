//! GitHub release metadata lookup.
//!
//! Resolves `owner/repo@tag` to the list of downloadable assets via the
//! GitHub REST API. A single lookup is performed per install; failures are
//! not retried here.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::download::{same_origin, USER_AGENT};
use super::error::{ManagerError, ManagerResult};
use super::traits::ReleaseClient;

/// GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Timeout for metadata requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Error bodies longer than this are cut before being embedded in errors.
const MAX_ERROR_BODY: usize = 512;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name as published (e.g. `Client.7z.001`).
    pub name: String,
    /// URL the content can be downloaded from.
    pub download_url: String,
    /// Size in bytes as reported by the host.
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<AssetResponse>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    name: String,
    #[serde(default)]
    browser_download_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    size: u64,
}

/// Release client backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    client: Client,
    api_base: Url,
}

impl GitHubReleaseClient {
    /// Create a client for the public GitHub API.
    pub fn new() -> ManagerResult<Self> {
        Self::with_api_base(DEFAULT_API_URL)
    }

    /// Create a client for a custom API root (GitHub Enterprise, a mirror, tests).
    pub fn with_api_base(api_base: &str) -> ManagerResult<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            ManagerError::InvalidConfig(format!("invalid API base URL {}: {}", api_base, e))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ManagerError::InvalidConfig(format!(
                "API base URL {} cannot carry a path",
                api_base
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(Policy::none())
            .build()
            .map_err(|e| {
                ManagerError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, api_base })
    }

    /// Build the release-by-tag endpoint URL.
    ///
    /// Each component is percent-encoded as a single path segment.
    pub fn release_url(&self, owner: &str, repo: &str, tag: &str) -> ManagerResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ManagerError::InvalidConfig(format!(
                    "API base URL {} cannot carry a path",
                    self.api_base
                ))
            })?
            .pop_if_empty()
            .extend(["repos", owner, repo, "releases", "tags", tag]);
        Ok(url)
    }

    fn get(&self, url: Url, token: Option<&str>) -> RequestBuilder {
        let request = self.client.get(url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send the lookup, following at most one redirect hop.
    fn send(&self, url: Url, token: Option<&str>) -> ManagerResult<Response> {
        let request_failed = |url: &Url, e: reqwest::Error| ManagerError::ReleaseRequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .get(url.clone(), token)
            .send()
            .map_err(|e| request_failed(&url, e))?;

        if !response.status().is_redirection() {
            return Ok(response);
        }

        let Some(next) = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| url.join(location).ok())
        else {
            return Ok(response);
        };

        debug!(from = %url, to = %next, "following release lookup redirect");
        let token = token.filter(|_| same_origin(&url, &next));
        self.get(next.clone(), token)
            .send()
            .map_err(|e| request_failed(&next, e))
    }
}

impl ReleaseClient for GitHubReleaseClient {
    fn release_assets(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        token: Option<&str>,
    ) -> ManagerResult<Vec<ReleaseAsset>> {
        let url = self.release_url(owner, repo, tag)?;
        debug!(%url, "fetching release by tag");

        let response = self.send(url.clone(), token)?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ManagerError::ReleaseRequestFailed {
                url: url.to_string(),
                reason: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(ManagerError::ReleaseLookupFailed {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        parse_release(&body)
    }
}

/// Parse a release JSON document into its assets.
///
/// The download URL is `browser_download_url`, falling back to the API `url`.
/// Assets carrying neither are dropped.
pub fn parse_release(json: &str) -> ManagerResult<Vec<ReleaseAsset>> {
    let release: ReleaseResponse =
        serde_json::from_str(json).map_err(|e| ManagerError::ReleaseParseFailed(e.to_string()))?;

    if let Some(tag) = &release.tag_name {
        debug!(tag, assets = release.assets.len(), "release metadata parsed");
    }

    Ok(release
        .assets
        .into_iter()
        .filter_map(|asset| {
            let download_url = asset
                .browser_download_url
                .filter(|u| !u.is_empty())
                .or(asset.url.filter(|u| !u.is_empty()));
            match download_url {
                Some(download_url) => Some(ReleaseAsset {
                    name: asset.name,
                    download_url,
                    size: asset.size,
                }),
                None => {
                    debug!(name = %asset.name, "asset has no download URL, ignoring");
                    None
                }
            }
        })
        .collect())
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_url_default_base() {
        let client = GitHubReleaseClient::new().unwrap();
        let url = client.release_url("acme", "client", "v1.0.0").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/client/releases/tags/v1.0.0"
        );
    }

    #[test]
    fn test_release_url_encodes_tag() {
        let client = GitHubReleaseClient::with_api_base("http://127.0.0.1:9/api/v3/").unwrap();
        let url = client
            .release_url("acme", "client", "release 1/beta#2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9/api/v3/repos/acme/client/releases/tags/release%201%2Fbeta%232"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        let result = GitHubReleaseClient::with_api_base("not a url");
        assert!(matches!(result, Err(ManagerError::InvalidConfig(_))));

        let result = GitHubReleaseClient::with_api_base("mailto:ops@example.com");
        assert!(matches!(result, Err(ManagerError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_release_assets() {
        let json = r#"{
            "tag_name": "v1.0.0",
            "assets": [
                {
                    "name": "Client.7z.001",
                    "browser_download_url": "https://example.com/Client.7z.001",
                    "url": "https://api.example.com/assets/1",
                    "size": 1024
                },
                {
                    "name": "SHA256SUMS.txt",
                    "url": "https://api.example.com/assets/2",
                    "size": 90
                },
                {
                    "name": "orphan.bin"
                }
            ]
        }"#;

        let assets = parse_release(json).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].name, "Client.7z.001");
        assert_eq!(assets[0].download_url, "https://example.com/Client.7z.001");
        assert_eq!(assets[0].size, 1024);
        assert_eq!(assets[1].download_url, "https://api.example.com/assets/2");
    }

    #[test]
    fn test_parse_release_without_assets() {
        let assets = parse_release(r#"{"tag_name": "v1"}"#).unwrap();
        assert!(assets.is_empty());
    }

    #[test]
    fn test_parse_release_invalid_json() {
        let result = parse_release("<html>rate limited</html>");
        assert!(matches!(result, Err(ManagerError::ReleaseParseFailed(_))));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  Not Found \n"), "Not Found");
        let long = "x".repeat(MAX_ERROR_BODY + 10);
        let cut = truncate_body(&long);
        assert_eq!(cut.len(), MAX_ERROR_BODY + 3);
        assert!(cut.ends_with("..."));
    }
}
