//! Checksum manifest (`SHA256SUMS.txt`) parsing.
//!
//! The manifest is produced by whatever tool the release publisher had at
//! hand, so parsing is deliberately permissive:
//!
//! - UTF-8 (with or without BOM), UTF-16LE and UTF-16BE (with BOM)
//! - `<hash>  name`, `<hash>\tname`, `<hash> *name` (binary-mode marker)
//! - hashes with embedded whitespace or mixed case
//! - quoted names, full Windows or Unix paths, non-breaking spaces
//!
//! Lines that do not yield a 64-character hex digest are skipped silently.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::error::{ManagerError, ManagerResult};

/// Filename of the checksum manifest asset in a release.
pub const MANIFEST_FILENAME: &str = "SHA256SUMS.txt";

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Get the manifest line pattern.
///
/// Group 1 is the run of hex digits and whitespace making up the hash,
/// group 2 is everything after the separating whitespace.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9a-fA-F\s]+)\s+(.+)$").unwrap())
}

/// Expected digests keyed by normalized file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: HashMap<String, String>,
}

impl ChecksumManifest {
    /// Decode and parse raw manifest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ManifestEmpty`] when no line produced a valid
    /// entry, since continuing would skip every integrity check.
    pub fn from_bytes(bytes: &[u8]) -> ManagerResult<Self> {
        let manifest = Self::parse(&decode_text(bytes));
        if manifest.is_empty() {
            return Err(ManagerError::ManifestEmpty);
        }
        Ok(manifest)
    }

    /// Parse already-decoded manifest text.
    ///
    /// Later lines overwrite earlier ones for the same name.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        let entries = text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(parse_line)
            .collect();

        Self { entries }
    }

    /// Expected digest for an asset or file name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize_name(name)).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode manifest bytes, detecting the encoding from the byte-order mark.
///
/// `FF FE` selects UTF-16LE, `FE FF` UTF-16BE; anything else is read as
/// UTF-8 (lossily) after stripping an optional UTF-8 BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => encoding_rs::UTF_16LE
            .decode_without_bom_handling(rest)
            .0
            .into_owned(),
        [0xFE, 0xFF, rest @ ..] => encoding_rs::UTF_16BE
            .decode_without_bom_handling(rest)
            .0
            .into_owned(),
        _ => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            String::from_utf8_lossy(body).into_owned()
        }
    }
}

/// Normalize a manifest name or asset name into a lookup key.
///
/// Strips one layer of quotes and a leading `*`, keeps only the final path
/// component (either separator style), collapses whitespace and lowercases.
pub fn normalize_name(raw: &str) -> String {
    let name = strip_quotes(raw.trim());
    let name = match name.strip_prefix('*') {
        // `*"name"` is what some tools emit for quoted binary-mode entries
        Some(rest) => strip_quotes(rest),
        None => name,
    };
    let name = name.replace('\u{00A0}', " ");
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let caps = line_pattern().captures(line)?;

    let digest: String = caps[1]
        .chars()
        .filter(char::is_ascii_hexdigit)
        .collect::<String>()
        .to_lowercase();
    if digest.len() != DIGEST_HEX_LEN {
        return None;
    }

    let key = normalize_name(&caps[2]);
    if key.is_empty() {
        return None;
    }

    Some((key, digest))
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
