//! SHA-256 checksum calculation for archive part verification.
//!
//! Parts are routinely several gigabytes, so the file is hashed in fixed-size
//! chunks and never loaded into memory as a whole.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::manager::error::{ManagerError, ManagerResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate SHA-256 checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal SHA-256 hash of the file contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn calculate_file_checksum(path: &Path) -> ManagerResult<String> {
    let mut file = File::open(path).map_err(|e| ManagerError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ManagerError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected checksum.
///
/// The comparison is case-insensitive on the expected side; the calculated
/// digest is always lowercase.
pub fn verify_checksum(path: &Path, expected: &str) -> ManagerResult<()> {
    let actual = calculate_file_checksum(path)?;
    let expected = expected.to_lowercase();
    if actual != expected {
        return Err(ManagerError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_calculate_file_checksum() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("client.7z.001");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let checksum = calculate_file_checksum(&file_path).unwrap();
        assert_eq!(checksum, HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.bin");

        File::create(&file_path).unwrap();

        let checksum = calculate_file_checksum(&file_path).unwrap();
        assert_eq!(
            checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        let result = calculate_file_checksum(Path::new("/nonexistent/client.7z.001"));
        assert!(matches!(result, Err(ManagerError::ReadFailed { .. })));
    }

    #[test]
    fn test_verify_checksum_accepts_uppercase_expected() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("client.7z.001");
        std::fs::write(&file_path, b"hello world").unwrap();

        let result = verify_checksum(&file_path, &HELLO_WORLD_SHA256.to_uppercase());
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("client.7z.002");
        std::fs::write(&file_path, b"hello world").unwrap();

        match verify_checksum(&file_path, "00ff") {
            Err(ManagerError::ChecksumMismatch {
                filename,
                expected,
                actual,
            }) => {
                assert_eq!(filename, "client.7z.002");
                assert_eq!(expected, "00ff");
                assert_eq!(actual, HELLO_WORLD_SHA256);
            }
            other => panic!("Expected ChecksumMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_chunk_file_matches_in_memory_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");

        // Larger than the buffer so several reads are needed
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file_path, &data).unwrap();

        let expected = format!("{:x}", Sha256::digest(&data));
        assert_eq!(calculate_file_checksum(&file_path).unwrap(), expected);
    }
}
