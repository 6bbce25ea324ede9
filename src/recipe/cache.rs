// src/recipe/cache.rs

//! Content-addressable binary cache
//!
//! A successful build leaves `artifacts/<fingerprint>.tar.xz` plus a
//! `.sha256` sidecar in the package workspace. The fingerprint is a
//! SHA-256 over:
//! - the recipe file bytes
//! - the target architecture
//! - every build option, sorted by name, as the name followed by
//!   `True` or `False`
//!
//! Identical inputs give the identical fingerprint on any machine, so a
//! later build with the same inputs can unpack the archive instead of
//! running the recipe again. An archive whose sidecar is missing or does
//! not match is treated as corrupt and rebuilt.

use crate::compression::{CompressionFormat, create_decoder};
use crate::error::{Error, Result};
use crate::hash::{self, sidecar_path};
use crate::recipe::kitchen::BuildConfiguration;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Extension of binary artifacts
pub const ARTIFACT_EXTENSION: &str = "tar.xz";

/// XZ preset used for artifacts
const XZ_LEVEL: u32 = 6;

/// Outcome of looking up a fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Archive present and matching its sidecar
    Hit(PathBuf),
    /// No archive for this fingerprint
    Miss,
    /// Archive present but its sidecar is missing or does not match
    Corrupt(PathBuf),
}

/// Binary cache rooted at one workspace's `artifacts/` directory
#[derive(Debug, Clone)]
pub struct BinaryCache {
    artifacts_dir: PathBuf,
}

impl BinaryCache {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Compute the fingerprint of a build configuration
    ///
    /// Reads the recipe from disk on every call so that edits are always
    /// picked up.
    pub fn fingerprint(config: &BuildConfiguration) -> Result<String> {
        let recipe = fs::read(&config.recipe_path).map_err(|e| {
            Error::IoError(format!(
                "Failed to read recipe {}: {}",
                config.recipe_path.display(),
                e
            ))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&recipe);
        hasher.update(config.target_architecture.as_bytes());

        // BTreeMap iterates in key order
        for (name, enabled) in &config.options {
            hasher.update(name.as_bytes());
            hasher.update(if *enabled { b"True".as_slice() } else { b"False".as_slice() });
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Path of the archive for `fingerprint`
    pub fn archive_path(&self, fingerprint: &str) -> PathBuf {
        self.artifacts_dir
            .join(format!("{}.{}", fingerprint, ARTIFACT_EXTENSION))
    }

    /// True iff `archive` has a sidecar matching its current content
    pub fn verify(&self, archive: &Path) -> Result<bool> {
        hash::verify_sidecar(archive)
    }

    /// Look up the archive for `fingerprint`
    pub fn lookup(&self, fingerprint: &str) -> Result<CacheLookup> {
        let archive = self.archive_path(fingerprint);

        if !archive.exists() {
            debug!("No cached archive at {}", archive.display());
            return Ok(CacheLookup::Miss);
        }

        match self.verify(&archive) {
            Ok(true) => Ok(CacheLookup::Hit(archive)),
            Ok(false) => {
                warn!("Cached archive {} failed verification", archive.display());
                Ok(CacheLookup::Corrupt(archive))
            }
            Err(e) => {
                warn!("Cannot verify cached archive {}: {}", archive.display(), e);
                Ok(CacheLookup::Corrupt(archive))
            }
        }
    }

    /// Compress `package_dir` into the archive for `fingerprint`
    ///
    /// The archive is written to a temporary file next to its final
    /// location and renamed into place. The sidecar is written last, from
    /// the final file.
    pub fn store(&self, package_dir: &Path, fingerprint: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.artifacts_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create {}: {}",
                self.artifacts_dir.display(),
                e
            ))
        })?;
        let archive = self.archive_path(fingerprint);

        // An old sidecar must never vouch for a new archive
        match fs::remove_file(sidecar_path(&archive)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut temp = NamedTempFile::new_in(&self.artifacts_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create temporary archive in {}: {}",
                self.artifacts_dir.display(),
                e
            ))
        })?;

        {
            let encoder = xz2::write::XzEncoder::new(temp.as_file_mut(), XZ_LEVEL);
            let mut builder = tar::Builder::new(encoder);
            builder.follow_symlinks(false);
            builder.append_dir_all(".", package_dir).map_err(|e| {
                Error::ArchiveError(format!(
                    "Failed to archive {}: {}",
                    package_dir.display(),
                    e
                ))
            })?;
            let encoder = builder
                .into_inner()
                .map_err(|e| Error::ArchiveError(format!("Failed to finish tar stream: {}", e)))?;
            encoder
                .finish()
                .map_err(|e| Error::ArchiveError(format!("Failed to finish xz stream: {}", e)))?;
        }

        temp.persist(&archive).map_err(|e| {
            Error::IoError(format!(
                "Failed to move archive into place at {}: {}",
                archive.display(),
                e.error
            ))
        })?;

        let digest = hash::write_sidecar(&archive)?;
        info!("Stored binary archive {} ({})", archive.display(), &digest[..16]);

        Ok(archive)
    }

    /// Unpack `archive` into `dest`, overwriting existing files
    pub fn restore(&self, archive: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dest.display(), e)))?;

        let file = File::open(archive)
            .map_err(|e| Error::IoError(format!("Failed to open {}: {}", archive.display(), e)))?;
        let decoder = create_decoder(BufReader::new(file), CompressionFormat::Xz)?;

        let mut tar = tar::Archive::new(decoder);
        tar.set_overwrite(true);
        tar.set_preserve_permissions(true);
        tar.unpack(dest).map_err(|e| {
            Error::ArchiveError(format!(
                "Failed to extract {} to {}: {}",
                archive.display(),
                dest.display(),
                e
            ))
        })?;

        debug!("Restored {} into {}", archive.display(), dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildFlags;
    use crate::recipe::format::{Atom, BuildOptions};
    use tempfile::TempDir;

    fn build_config(recipe: &Path, options: &[(&str, bool)], arch: &str) -> BuildConfiguration {
        BuildConfiguration {
            atom: Atom::new("foo", "1.2", "0"),
            recipe_path: recipe.to_path_buf(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BuildOptions>(),
            target_architecture: arch.to_string(),
            build_flags: BuildFlags::default(),
        }
    }

    fn recipe_file(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("foo-1.2.sh");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_fingerprint_matches_reference_layout() {
        let dir = TempDir::new().unwrap();
        let recipe = recipe_file(&dir, "handle_build() { :; }\n");
        let config = build_config(&recipe, &[("docs", true), ("tests", false)], "x86_64");

        let expected = hash::sha256_bytes(b"handle_build() { :; }\nx86_64docsTruetestsFalse");
        assert_eq!(BinaryCache::fingerprint(&config).unwrap(), expected);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let recipe = recipe_file(&dir, "sources=()\n");
        let config = build_config(&recipe, &[("a", true)], "x86_64");

        let first = BinaryCache::fingerprint(&config).unwrap();
        let second = BinaryCache::fingerprint(&config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), hash::SHA256_HEX_LEN);
    }

    #[test]
    fn test_fingerprint_ignores_option_order() {
        let dir = TempDir::new().unwrap();
        let recipe = recipe_file(&dir, "sources=()\n");

        let ab = build_config(&recipe, &[("a", true), ("b", false)], "x86_64");
        let ba = build_config(&recipe, &[("b", false), ("a", true)], "x86_64");
        assert_eq!(
            BinaryCache::fingerprint(&ab).unwrap(),
            BinaryCache::fingerprint(&ba).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let dir = TempDir::new().unwrap();
        let recipe = recipe_file(&dir, "sources=()\n");
        let base = BinaryCache::fingerprint(&build_config(&recipe, &[("a", true)], "x86_64")).unwrap();

        let flipped = build_config(&recipe, &[("a", false)], "x86_64");
        let added = build_config(&recipe, &[("a", true), ("b", true)], "x86_64");
        let removed = build_config(&recipe, &[], "x86_64");
        let other_arch = build_config(&recipe, &[("a", true)], "aarch64");

        for config in [flipped, added, removed, other_arch] {
            assert_ne!(BinaryCache::fingerprint(&config).unwrap(), base);
        }

        fs::write(&recipe, "sources=()\n# edited\n").unwrap();
        let edited = build_config(&recipe, &[("a", true)], "x86_64");
        assert_ne!(BinaryCache::fingerprint(&edited).unwrap(), base);
    }

    #[test]
    fn test_fingerprint_missing_recipe() {
        let config = build_config(Path::new("/nonexistent/foo.sh"), &[], "x86_64");
        assert!(BinaryCache::fingerprint(&config).is_err());
    }

    #[test]
    fn test_archive_path() {
        let cache = BinaryCache::new("/ws/foo/1.2-0/artifacts");
        assert_eq!(
            cache.archive_path("abc"),
            PathBuf::from("/ws/foo/1.2-0/artifacts/abc.tar.xz")
        );
    }

    #[test]
    fn test_store_lookup_restore() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("package");
        fs::create_dir_all(package.join("usr/bin")).unwrap();
        fs::write(package.join("usr/bin/foo"), b"#!/bin/sh\necho foo\n").unwrap();

        let cache = BinaryCache::new(dir.path().join("artifacts"));
        assert_eq!(cache.lookup("f00d").unwrap(), CacheLookup::Miss);

        let archive = cache.store(&package, "f00d").unwrap();
        assert_eq!(archive, cache.archive_path("f00d"));
        assert!(sidecar_path(&archive).exists());
        assert_eq!(cache.lookup("f00d").unwrap(), CacheLookup::Hit(archive.clone()));

        // No temporary files left behind
        let names: Vec<_> = fs::read_dir(cache.artifacts_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);

        let restored = dir.path().join("restored");
        cache.restore(&archive, &restored).unwrap();
        assert_eq!(
            fs::read(restored.join("usr/bin/foo")).unwrap(),
            b"#!/bin/sh\necho foo\n"
        );
    }

    #[test]
    fn test_lookup_detects_corruption() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("package");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("file"), b"content").unwrap();

        let cache = BinaryCache::new(dir.path().join("artifacts"));
        let archive = cache.store(&package, "beef").unwrap();

        fs::write(&archive, b"tampered").unwrap();
        assert_eq!(cache.lookup("beef").unwrap(), CacheLookup::Corrupt(archive.clone()));
        assert!(!cache.verify(&archive).unwrap());
    }

    #[test]
    fn test_lookup_without_sidecar_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = BinaryCache::new(dir.path());
        fs::write(cache.archive_path("cafe"), b"whatever").unwrap();

        assert!(matches!(cache.lookup("cafe").unwrap(), CacheLookup::Corrupt(_)));
    }

    #[test]
    fn test_lookup_with_unreadable_sidecar_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = BinaryCache::new(dir.path());
        let archive = cache.archive_path("f00d");
        fs::write(&archive, b"whatever").unwrap();
        fs::create_dir(sidecar_path(&archive)).unwrap();

        assert_eq!(cache.lookup("f00d").unwrap(), CacheLookup::Corrupt(archive));
    }

    #[test]
    fn test_store_overwrites_existing_archive() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("package");
        fs::create_dir_all(&package).unwrap();
        let cache = BinaryCache::new(dir.path().join("artifacts"));

        fs::write(package.join("file"), b"one").unwrap();
        cache.store(&package, "abcd").unwrap();
        fs::write(package.join("file"), b"two").unwrap();
        let archive = cache.store(&package, "abcd").unwrap();

        assert!(cache.verify(&archive).unwrap());
        let restored = dir.path().join("restored");
        cache.restore(&archive, &restored).unwrap();
        assert_eq!(fs::read(restored.join("file")).unwrap(), b"two");
    }
}
