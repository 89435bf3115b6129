//! End-to-end install tests.
//!
//! A mockito server plays the release host and a small shell script stands
//! in for the 7-Zip executable, so the full pipeline runs with the real
//! HTTP fetcher, release client and process handling.
//!
//! Run with: `cargo test --test install_pipeline`

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use launchkit::manager::{
    ClientInstaller, ErrorKind, InstallRequest, ManagerError, NullObserver, RetryPolicy,
    MARKER_FILENAME,
};
use mockito::{Mock, Server, ServerGuard};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

const PART1: &[u8] = b"7z volume one";
const PART2: &[u8] = b"7z volume two";

const STUB_EXTRACTOR: &str = r#"#!/bin/sh
out=""
for arg in "$@"; do
  case "$arg" in
    -o*) out="${arg#-o}" ;;
  esac
done
[ -n "$out" ] || exit 7
mkdir -p "$out"
echo "extracted from $2" > "$out/contents.txt"
echo "Everything is Ok"
exit 0
"#;

const FAILING_EXTRACTOR: &str = "#!/bin/sh\necho 'ERROR: Data Error' >&2\nexit 2\n";

// ============================================================================
// Helper Functions
// ============================================================================

fn sha(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Mocks for one release: metadata, manifest and two parts.
struct ReleaseHost {
    server: ServerGuard,
    release: Mock,
    manifest: Mock,
    part1: Mock,
    part2: Mock,
}

impl ReleaseHost {
    fn start(manifest_body: &[u8], part1_hits: usize, part2_hits: usize) -> Self {
        let mut server = Server::new();
        let base = server.url();

        let release_json = format!(
            r#"{{
                "tag_name": "v1.0.0",
                "assets": [
                    {{"name": "Client.7z.002", "browser_download_url": "{base}/dl/Client.7z.002", "size": {s2}}},
                    {{"name": "SHA256SUMS.txt", "browser_download_url": "{base}/dl/SHA256SUMS.txt", "size": 0}},
                    {{"name": "Client.7z.001", "browser_download_url": "{base}/dl/Client.7z.001", "size": {s1}}},
                    {{"name": "notes.md", "browser_download_url": "{base}/dl/notes.md", "size": 0}}
                ]
            }}"#,
            base = base,
            s1 = PART1.len(),
            s2 = PART2.len(),
        );

        let release = server
            .mock("GET", "/repos/acme/client/releases/tags/v1.0.0")
            .with_status(200)
            .with_body(release_json)
            .expect(1)
            .create();
        let manifest = server
            .mock("GET", "/dl/SHA256SUMS.txt")
            .with_status(200)
            .with_body(manifest_body)
            .expect(1)
            .create();
        let part1 = server
            .mock("GET", "/dl/Client.7z.001")
            .with_status(200)
            .with_body(PART1)
            .expect(part1_hits)
            .create();
        let part2 = server
            .mock("GET", "/dl/Client.7z.002")
            .with_status(200)
            .with_body(PART2)
            .expect(part2_hits)
            .create();

        Self {
            server,
            release,
            manifest,
            part1,
            part2,
        }
    }

    fn assert_all(&self) {
        self.release.assert();
        self.manifest.assert();
        self.part1.assert();
        self.part2.assert();
    }
}

fn standard_manifest() -> Vec<u8> {
    format!(
        "{}  Client.7z.001\r\n{} *Client.7z.002\r\n",
        sha(PART1),
        sha(PART2)
    )
    .into_bytes()
}

fn request(temp: &TempDir, host: &ReleaseHost, extractor: PathBuf) -> InstallRequest {
    InstallRequest::new(
        "acme",
        "client",
        "v1.0.0",
        temp.path().join("install"),
        extractor,
    )
    .with_download_dir(temp.path().join("download"))
    .with_api_base_url(host.server.url())
    .with_retry(RetryPolicy::new(3, Duration::ZERO))
    .with_space_margin(Some(0))
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_end_to_end_install_then_skip() {
    let temp = TempDir::new().unwrap();
    let extractor = write_script(temp.path(), "7za", STUB_EXTRACTOR);
    let host = ReleaseHost::start(&standard_manifest(), 1, 1);
    let request = request(&temp, &host, extractor);

    let installer = ClientInstaller::new(&request).unwrap();
    let outcome = installer.install(&request, &NullObserver).unwrap();

    assert!(!outcome.skipped);
    assert_eq!(outcome.version, "v1.0.0");
    assert_eq!(outcome.parts_downloaded, 2);

    let contents = fs::read_to_string(request.install_dir.join("contents.txt")).unwrap();
    assert!(contents.contains("Client.7z.001"));
    assert_eq!(
        fs::read(request.install_dir.join(MARKER_FILENAME)).unwrap(),
        b"v1.0.0\r\n"
    );
    assert!(!request.download_dir.exists());

    // Second run: no network at all
    let outcome = installer.install(&request, &NullObserver).unwrap();
    assert!(outcome.skipped);
    host.assert_all();
}

#[test]
fn test_corrupt_part_on_disk_is_replaced() {
    let temp = TempDir::new().unwrap();
    let extractor = write_script(temp.path(), "7za", STUB_EXTRACTOR);
    let host = ReleaseHost::start(&standard_manifest(), 1, 0);
    let request = request(&temp, &host, extractor).with_cleanup_parts(false);

    fs::create_dir_all(&request.download_dir).unwrap();
    fs::write(request.download_dir.join("Client.7z.001"), b"half a vol").unwrap();
    fs::write(request.download_dir.join("Client.7z.002"), PART2).unwrap();

    let outcome = ClientInstaller::new(&request)
        .unwrap()
        .install(&request, &NullObserver)
        .unwrap();

    assert_eq!(outcome.parts_downloaded, 1);
    assert_eq!(outcome.parts_reused, 1);
    assert_eq!(
        fs::read(request.download_dir.join("Client.7z.001")).unwrap(),
        PART1
    );
    host.assert_all();
}

#[test]
fn test_utf16_manifest() {
    let temp = TempDir::new().unwrap();
    let extractor = write_script(temp.path(), "7za", STUB_EXTRACTOR);

    let text = String::from_utf8(standard_manifest()).unwrap();
    let mut manifest = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        manifest.extend_from_slice(&unit.to_le_bytes());
    }

    let host = ReleaseHost::start(&manifest, 1, 1);
    let request = request(&temp, &host, extractor);

    ClientInstaller::new(&request)
        .unwrap()
        .install(&request, &NullObserver)
        .unwrap();
    host.assert_all();
}

#[test]
fn test_extractor_failure_keeps_parts_and_marker_absent() {
    let temp = TempDir::new().unwrap();
    let extractor = write_script(temp.path(), "7za", FAILING_EXTRACTOR);
    let host = ReleaseHost::start(&standard_manifest(), 1, 1);
    let request = request(&temp, &host, extractor);

    let err = ClientInstaller::new(&request)
        .unwrap()
        .install(&request, &NullObserver)
        .unwrap_err();

    assert!(matches!(err, ManagerError::ExtractorFailed { code: Some(2) }));
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(request.download_dir.join("Client.7z.001").exists());
    assert!(request.download_dir.join("Client.7z.002").exists());
    assert!(!request.install_dir.join(MARKER_FILENAME).exists());
}

#[test]
fn test_part_download_exhausts_retries() {
    let temp = TempDir::new().unwrap();
    let extractor = write_script(temp.path(), "7za", STUB_EXTRACTOR);

    let mut server = Server::new();
    let base = server.url();
    let _release = server
        .mock("GET", "/repos/acme/client/releases/tags/v1.0.0")
        .with_status(200)
        .with_body(format!(
            r#"{{"assets": [
                {{"name": "Client.7z.001", "browser_download_url": "{base}/dl/Client.7z.001"}},
                {{"name": "SHA256SUMS.txt", "browser_download_url": "{base}/dl/SHA256SUMS.txt"}}
            ]}}"#
        ))
        .create();
    let _manifest = server
        .mock("GET", "/dl/SHA256SUMS.txt")
        .with_status(200)
        .with_body(format!("{}  Client.7z.001\n", sha(PART1)))
        .create();
    let part = server
        .mock("GET", "/dl/Client.7z.001")
        .with_status(500)
        .expect(3)
        .create();

    let request = InstallRequest::new(
        "acme",
        "client",
        "v1.0.0",
        temp.path().join("install"),
        extractor,
    )
    .with_download_dir(temp.path().join("download"))
    .with_api_base_url(base.clone())
    .with_retry(RetryPolicy::new(3, Duration::ZERO))
    .with_space_margin(Some(0));

    match ClientInstaller::new(&request)
        .unwrap()
        .install(&request, &NullObserver)
    {
        Err(ManagerError::TransferExhausted {
            asset, attempts, ..
        }) => {
            assert_eq!(asset, "Client.7z.001");
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected TransferExhausted, got {:?}", other),
    }
    part.assert();
    assert!(!request.download_dir.join("Client.7z.001").exists());
}
