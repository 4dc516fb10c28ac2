//! SHA-256 content verification.
//!
//! Validates integrity of downloaded artifacts.

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

const READ_CHUNK: usize = 64 * 1024;

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns `DeployError::Build` if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e: std::io::Error| DeployError::Build {
        image: path.display().to_string(),
        stage: "verify",
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hex = hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        });
    Sha256Hash::from_hex(hex)
}

/// Validates that a file matches the expected SHA-256 hash.
///
/// # Errors
///
/// Returns `DeployError::Build` if the file cannot be read or the hashes
/// do not match.
pub fn validate_hash(path: &Path, expected: &Sha256Hash) -> Result<()> {
    let actual = hash_file(path)?;
    if &actual != expected {
        return Err(DeployError::Build {
            image: path.display().to_string(),
            stage: "verify",
            message: format!("expected {expected}, got {actual}"),
        });
    }
    tracing::debug!(path = %path.display(), "SHA-256 verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello\n")
    const HELLO: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn hash_file_matches_known_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello\n").expect("write");
        assert_eq!(hash_file(&path).expect("hash").as_hex(), HELLO);
    }

    #[test]
    fn validate_hash_accepts_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello\n").expect("write");
        let expected = Sha256Hash::from_hex(HELLO).expect("hex");
        validate_hash(&path, &expected).expect("should match");
    }

    #[test]
    fn validate_hash_rejects_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("other.txt");
        std::fs::write(&path, b"other\n").expect("write");
        let expected = Sha256Hash::from_hex(HELLO).expect("hex");
        let err = validate_hash(&path, &expected).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "verify", .. }));
    }

    #[test]
    fn hash_missing_file_is_verify_failure() {
        let err = hash_file(Path::new("/nonexistent/file")).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "verify", .. }));
        assert_eq!(err.kind(), dbdeploy_common::error::ErrorKind::Build);
    }
}
