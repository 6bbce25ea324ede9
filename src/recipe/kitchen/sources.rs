// src/recipe/kitchen/sources.rs

//! Source acquisition
//!
//! Each source locator declared by a recipe is resolved with the first
//! strategy that matches:
//!
//! 1. an `http`/`https` URL, downloaded
//! 2. an existing file path (absolute or relative to the current directory)
//! 3. a path relative to the recipe's directory
//! 4. a path relative to each repository root, in configured order
//!
//! The file lands in the workspace's `source/` directory under its base
//! name, is checked against the declared SHA-256 and, when it turns out to
//! be a tarball, unpacked in place.

use super::archive::{SourceDownloader, extract_archive, file_name_for_url, parse_source_url};
use crate::error::{Error, Result};
use crate::hash::{digests_match, sha256_file};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Where a source locator resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Url(Url),
    /// Existing path as written in the recipe
    Path(PathBuf),
    /// Path under the recipe's directory
    RecipeRelative(PathBuf),
    /// Path under a repository root
    RepositoryRelative { repository: PathBuf, path: PathBuf },
}

/// A source materialized in the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredSource {
    pub origin: SourceOrigin,
    /// Local copy inside the source directory
    pub path: PathBuf,
    /// Whether the file was a tarball and got unpacked
    pub extracted: bool,
}

/// Resolves and materializes the sources of one build attempt
pub struct SourceFetcher<'a> {
    downloader: &'a dyn SourceDownloader,
    recipe_dir: &'a Path,
    repositories: &'a [PathBuf],
    source_dir: &'a Path,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(
        downloader: &'a dyn SourceDownloader,
        recipe_dir: &'a Path,
        repositories: &'a [PathBuf],
        source_dir: &'a Path,
    ) -> Self {
        Self {
            downloader,
            recipe_dir,
            repositories,
            source_dir,
        }
    }

    /// Decide where `locator` comes from without touching the workspace
    pub fn resolve(&self, locator: &str) -> Result<SourceOrigin> {
        if let Some(url) = parse_source_url(locator) {
            debug!("Source {} is a URL", locator);
            return Ok(SourceOrigin::Url(url));
        }

        let direct = PathBuf::from(locator);
        if direct.is_file() {
            debug!("Source {} is a direct path", locator);
            return Ok(SourceOrigin::Path(direct));
        }

        let recipe_relative = self.recipe_dir.join(locator);
        if recipe_relative.is_file() {
            debug!("Source {} is relative to the recipe directory", locator);
            return Ok(SourceOrigin::RecipeRelative(recipe_relative));
        }

        for repository in self.repositories {
            let candidate = repository.join(locator);
            if candidate.is_file() {
                debug!(
                    "Source {} is relative to the repository {}",
                    locator,
                    repository.display()
                );
                return Ok(SourceOrigin::RepositoryRelative {
                    repository: repository.clone(),
                    path: candidate,
                });
            }
        }

        Err(Error::SourceNotFound(locator.to_string()))
    }

    /// Resolve, copy or download, verify and unpack one source
    pub fn acquire(&self, locator: &str, expected_sha256: &str) -> Result<AcquiredSource> {
        info!(
            "Acquiring source {} into {}",
            locator,
            self.source_dir.display()
        );

        let origin = self.resolve(locator)?;
        let path = self.materialize(locator, &origin)?;

        let actual = sha256_file(&path)?;
        if !digests_match(&actual, expected_sha256) {
            return Err(Error::ChecksumMismatch {
                source_name: locator.to_string(),
                expected: expected_sha256.to_string(),
                actual,
            });
        }
        debug!("Source {} checksum verified", locator);

        let extracted = extract_archive(&path, self.source_dir)?;

        Ok(AcquiredSource {
            origin,
            path,
            extracted,
        })
    }

    fn materialize(&self, locator: &str, origin: &SourceOrigin) -> Result<PathBuf> {
        match origin {
            SourceOrigin::Url(url) => {
                let dest = self.source_dir.join(file_name_for_url(url)?);
                self.downloader.download(url, &dest)?;
                Ok(dest)
            }
            SourceOrigin::Path(from)
            | SourceOrigin::RecipeRelative(from)
            | SourceOrigin::RepositoryRelative { path: from, .. } => {
                let name = from
                    .file_name()
                    .ok_or_else(|| Error::SourceNotFound(locator.to_string()))?;
                let dest = self.source_dir.join(name);
                fs::copy(from, &dest).map_err(|e| {
                    Error::IoError(format!(
                        "Failed to copy {} to {}: {}",
                        from.display(),
                        dest.display(),
                        e
                    ))
                })?;
                Ok(dest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256_bytes;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves every URL with fixed content and records what was asked for
    struct FixedDownloader {
        body: Vec<u8>,
        requested: Mutex<Vec<String>>,
    }

    impl FixedDownloader {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl SourceDownloader for FixedDownloader {
        fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
            self.requested.lock().unwrap().push(url.to_string());
            fs::write(dest, &self.body)?;
            Ok(self.body.len() as u64)
        }
    }

    struct Layout {
        _dir: TempDir,
        recipe_dir: PathBuf,
        repos: Vec<PathBuf>,
        source_dir: PathBuf,
    }

    fn layout() -> Layout {
        let dir = TempDir::new().unwrap();
        let recipe_dir = dir.path().join("repo1/core/recipes/foo");
        let repos = vec![dir.path().join("repo1"), dir.path().join("repo2")];
        let source_dir = dir.path().join("ws/source");
        for d in [&recipe_dir, &repos[1], &source_dir] {
            fs::create_dir_all(d).unwrap();
        }
        Layout {
            _dir: dir,
            recipe_dir,
            repos,
            source_dir,
        }
    }

    #[test]
    fn test_url_source_is_downloaded() {
        let layout = layout();
        let downloader = FixedDownloader::new(b"patch body");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let acquired = fetcher
            .acquire("https://example.org/fix.patch", &sha256_bytes(b"patch body"))
            .unwrap();

        assert!(matches!(acquired.origin, SourceOrigin::Url(_)));
        assert_eq!(acquired.path, layout.source_dir.join("fix.patch"));
        assert!(!acquired.extracted);
        assert_eq!(
            *downloader.requested.lock().unwrap(),
            vec!["https://example.org/fix.patch".to_string()]
        );
    }

    #[test]
    fn test_recipe_relative_source_is_copied() {
        let layout = layout();
        fs::create_dir_all(layout.recipe_dir.join("patches")).unwrap();
        fs::write(layout.recipe_dir.join("patches/fix.patch"), b"local").unwrap();

        let downloader = FixedDownloader::new(b"");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let acquired = fetcher
            .acquire("patches/fix.patch", &sha256_bytes(b"local"))
            .unwrap();
        assert_eq!(
            acquired.origin,
            SourceOrigin::RecipeRelative(layout.recipe_dir.join("patches/fix.patch"))
        );
        assert_eq!(fs::read(layout.source_dir.join("fix.patch")).unwrap(), b"local");
    }

    #[test]
    fn test_repository_order() {
        let layout = layout();
        fs::create_dir_all(layout.repos[0].join("shared")).unwrap();
        fs::create_dir_all(layout.repos[1].join("shared")).unwrap();
        fs::write(layout.repos[0].join("shared/common.patch"), b"first").unwrap();
        fs::write(layout.repos[1].join("shared/common.patch"), b"second").unwrap();

        let downloader = FixedDownloader::new(b"");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let origin = fetcher.resolve("shared/common.patch").unwrap();
        assert_eq!(
            origin,
            SourceOrigin::RepositoryRelative {
                repository: layout.repos[0].clone(),
                path: layout.repos[0].join("shared/common.patch"),
            }
        );
    }

    #[test]
    fn test_recipe_dir_wins_over_repository() {
        let layout = layout();
        fs::write(layout.recipe_dir.join("extra.txt"), b"recipe").unwrap();
        fs::write(layout.repos[1].join("extra.txt"), b"repo").unwrap();

        let downloader = FixedDownloader::new(b"");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        assert!(matches!(
            fetcher.resolve("extra.txt").unwrap(),
            SourceOrigin::RecipeRelative(_)
        ));
    }

    #[test]
    fn test_absolute_path_source() {
        let layout = layout();
        let outside = TempDir::new().unwrap();
        let file = outside.path().join("vendored.tar");
        fs::write(&file, b"not really a tar").unwrap();

        let downloader = FixedDownloader::new(b"");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let locator = file.to_string_lossy().into_owned();
        let acquired = fetcher
            .acquire(&locator, &sha256_bytes(b"not really a tar"))
            .unwrap();
        assert_eq!(acquired.origin, SourceOrigin::Path(file));
        assert!(!acquired.extracted);
    }

    #[test]
    fn test_unresolvable_source() {
        let layout = layout();
        let downloader = FixedDownloader::new(b"");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let err = fetcher.acquire("missing.tar.gz", "00").unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(ref s) if s == "missing.tar.gz"));
    }

    #[test]
    fn test_checksum_mismatch() {
        let layout = layout();
        let downloader = FixedDownloader::new(b"tampered");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let err = fetcher
            .acquire("https://example.org/foo.tar.gz", &sha256_bytes(b"original"))
            .unwrap_err();
        match err {
            Error::ChecksumMismatch { actual, .. } => assert_eq!(actual, sha256_bytes(b"tampered")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_checksum_is_case_insensitive() {
        let layout = layout();
        let downloader = FixedDownloader::new(b"body");
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let upper = sha256_bytes(b"body").to_uppercase();
        assert!(fetcher.acquire("https://example.org/body", &upper).is_ok());
    }

    #[test]
    fn test_tarball_is_extracted() {
        let layout = layout();
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"all:\n\ttrue\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "foo-1.2/Makefile", &data[..]).unwrap();
        let tarball = builder.into_inner().unwrap();

        let downloader = FixedDownloader::new(&tarball);
        let fetcher = SourceFetcher::new(&downloader, &layout.recipe_dir, &layout.repos, &layout.source_dir);

        let acquired = fetcher
            .acquire("https://example.org/foo-1.2.tar", &sha256_bytes(&tarball))
            .unwrap();
        assert!(acquired.extracted);
        assert!(layout.source_dir.join("foo-1.2/Makefile").exists());
    }
}
