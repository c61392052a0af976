//! SHA-256 verification of completed downloads.
//!
//! Product files in the distribution API carry SHA-256 digests; this runs
//! after assembly, off the download hot path.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const READ_BUF: usize = 64 * 1024;

/// Streamed SHA-256 of a file, as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUF];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compares a file's digest against an expected hex string
/// (case-insensitive). Errors when they differ.
pub fn verify_sha256(path: &Path, expected_hex: &str) -> Result<()> {
    let actual = sha256_path(path)?;
    if !actual.eq_ignore_ascii_case(expected_hex.trim()) {
        anyhow::bail!(
            "checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected_hex.trim(),
            actual
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    fn file_with(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn digest_of_known_content() {
        let f = file_with(b"hello\n");
        assert_eq!(sha256_path(f.path()).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let f = file_with(b"hello\n");
        verify_sha256(f.path(), &HELLO_SHA256.to_uppercase()).unwrap();
    }

    #[test]
    fn verify_rejects_wrong_digest() {
        let f = file_with(b"hello\n");
        let err = verify_sha256(f.path(), "deadbeef").unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
