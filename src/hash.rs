// src/hash.rs

//! SHA-256 helpers for source verification and artifact sidecars
//!
//! Source checksums declared by recipes and the `.sha256` sidecar files
//! written next to binary artifacts are both plain hex SHA-256 digests.
//! Comparisons are case-insensitive since recipe authors paste digests
//! from wherever upstream publishes them.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Length of a hex-encoded SHA-256 digest
pub const SHA256_HEX_LEN: usize = 64;

/// Extension appended to an archive path to name its sidecar checksum file
pub const SIDECAR_EXTENSION: &str = "sha256";

/// Hash a byte slice and return the lowercase hex digest
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Stream a file through SHA-256 without loading it into memory
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case and surrounding whitespace
pub fn digests_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Check a file against an expected hex digest
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<bool> {
    let actual = sha256_file(path)?;
    Ok(digests_match(&actual, expected))
}

/// Path of the sidecar checksum file for `path`
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Hash `path` and write the digest to its sidecar file
///
/// The sidecar uses the `sha256sum` line format so it can be checked by
/// hand with `sha256sum -c`.
pub fn write_sidecar(path: &Path) -> Result<String> {
    let digest = sha256_file(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = sidecar_path(path);
    fs::write(&sidecar, format!("{}  {}\n", digest, file_name))
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", sidecar.display(), e)))?;
    Ok(digest)
}

/// Read the digest recorded in the sidecar file of `path`
///
/// Returns `None` when there is no sidecar.
pub fn read_sidecar(path: &Path) -> Result<Option<String>> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(None);
    }

    let bytes = fs::read(&sidecar).map_err(|e| {
        Error::IoError(format!("Failed to read checksum file {}: {}", sidecar.display(), e))
    })?;
    let content = std::str::from_utf8(&bytes).map_err(|_| {
        Error::ParseError(format!("Checksum file is not text: {}", sidecar.display()))
    })?;
    let digest = content
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::ParseError(format!("Empty checksum file: {}", sidecar.display())))?;

    if digest.len() != SHA256_HEX_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::ParseError(format!(
            "Malformed checksum in {}: {}",
            sidecar.display(),
            digest
        )));
    }

    Ok(Some(digest.to_string()))
}

/// True iff `path` has a sidecar and the file currently matches it
pub fn verify_sidecar(path: &Path) -> Result<bool> {
    match read_sidecar(path) {
        Ok(Some(expected)) => verify_file_checksum(path, &expected),
        Ok(None) => Ok(false),
        // A garbled sidecar is as good as a mismatch
        Err(Error::ParseError(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
