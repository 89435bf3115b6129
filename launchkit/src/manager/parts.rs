//! Selection and ordering of multi-part archive assets.
//!
//! A release publishes the client as `<base>.7z.001`, `<base>.7z.002`, ...
//! Parts must be processed in numeric order, and `.7z.010` has to sort after
//! `.7z.002`, so plain lexical ordering is not enough.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

use regex::Regex;

use super::manifest::MANIFEST_FILENAME;
use super::release::ReleaseAsset;

/// Get the part filename pattern.
///
/// Matches `<anything>.7z.NN` or `<anything>.7z.NNN`, case-insensitive.
fn part_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.7z\.\d{2,3}$").unwrap())
}

/// Whether `name` looks like a volume of a split 7z archive.
///
/// # Examples
///
/// ```
/// use launchkit::manager::is_part_name;
///
/// assert!(is_part_name("Client.7z.001"));
/// assert!(is_part_name("client.7Z.10"));
/// assert!(!is_part_name("Client.7z"));
/// assert!(!is_part_name("SHA256SUMS.txt"));
/// ```
pub fn is_part_name(name: &str) -> bool {
    part_pattern().is_match(name)
}

/// Select the archive parts of a release, in extraction order.
pub fn select_parts(assets: &[ReleaseAsset]) -> Vec<ReleaseAsset> {
    let mut parts: Vec<ReleaseAsset> = assets
        .iter()
        .filter(|a| is_part_name(&a.name))
        .cloned()
        .collect();
    parts.sort_by(|a, b| compare_natural(&a.name, &b.name));
    parts
}

/// Find the checksum manifest asset, named exactly `SHA256SUMS.txt`.
pub fn find_manifest_asset(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    assets.iter().find(|a| a.name == MANIFEST_FILENAME)
}

/// Compare two names treating runs of ASCII digits as numbers.
///
/// Non-digit characters compare case-insensitively. Equal numeric values
/// with different zero padding fall back to the shorter run first, and a
/// full tie falls back to a plain byte comparison so the ordering is total.
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ord = compare_digit_runs(&l_run, &r_run);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');

    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.com/{}", name),
            size: 0,
        }
    }

    fn names(assets: &[ReleaseAsset]) -> Vec<&str> {
        assets.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_is_part_name() {
        assert!(is_part_name("Client.7z.001"));
        assert!(is_part_name("Client.7Z.002"));
        assert!(is_part_name("game.7z.01"));
        assert!(!is_part_name("game.7z.1"));
        assert!(!is_part_name("game.7z.0001"));
        assert!(!is_part_name("game.zip.001"));
        assert!(!is_part_name("game.7z.001.sig"));
    }

    #[test]
    fn test_select_parts_orders_numerically() {
        let assets: Vec<ReleaseAsset> = [
            "Client.7z.010",
            "SHA256SUMS.txt",
            "Client.7z.002",
            "README.md",
            "Client.7z.001",
            "Client.7z.100",
            "Client.7z.011",
        ]
        .iter()
        .map(|n| asset(n))
        .collect();

        let parts = select_parts(&assets);
        assert_eq!(
            names(&parts),
            vec![
                "Client.7z.001",
                "Client.7z.002",
                "Client.7z.010",
                "Client.7z.011",
                "Client.7z.100",
            ]
        );
    }

    #[test]
    fn test_select_parts_empty() {
        let assets = vec![asset("SHA256SUMS.txt"), asset("Client.zip")];
        assert!(select_parts(&assets).is_empty());
    }

    #[test]
    fn test_find_manifest_asset_exact_name() {
        let assets = vec![asset("Client.7z.001"), asset("SHA256SUMS.txt")];
        let found = find_manifest_asset(&assets).unwrap();
        assert_eq!(found.name, "SHA256SUMS.txt");

        assert!(find_manifest_asset(&assets[..1]).is_none());
    }

    #[test]
    fn test_find_manifest_asset_ignores_other_case() {
        let assets = vec![asset("sha256sums.TXT"), asset("SHA256SUMS.TXT")];
        assert!(find_manifest_asset(&assets).is_none());
    }

    #[test]
    fn test_compare_natural() {
        assert_eq!(compare_natural("a.7z.002", "a.7z.010"), Ordering::Less);
        assert_eq!(compare_natural("a.7z.10", "a.7z.009"), Ordering::Greater);
        assert_eq!(compare_natural("File2", "file10"), Ordering::Less);
        assert_eq!(compare_natural("abc", "ABD"), Ordering::Less);
        assert_eq!(compare_natural("a", "a1"), Ordering::Less);
        assert_eq!(compare_natural("a.7z.001", "a.7z.001"), Ordering::Equal);
        assert_ne!(compare_natural("a.7z.01", "a.7z.001"), Ordering::Equal);
    }

    #[test]
    fn test_lexical_order_would_differ() {
        let mut lexical = vec!["p.7z.10", "p.7z.9"];
        lexical.sort();
        assert_eq!(lexical, vec!["p.7z.10", "p.7z.9"]);

        let mut natural = lexical.clone();
        natural.sort_by(|a, b| compare_natural(a, b));
        assert_eq!(natural, vec!["p.7z.9", "p.7z.10"]);
    }
}
