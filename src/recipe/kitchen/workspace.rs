// src/recipe/kitchen/workspace.rs

//! Per-package workspace layout
//!
//! ```text
//! <root>/<name>/<version>-<release>/
//!     .lock
//!     source/      recreated empty for every attempt
//!     build/       created if missing, never cleared
//!     package/     created if missing, never cleared
//!     artifacts/   binary cache, never touched destructively
//! ```
//!
//! `build/` and `package/` keep whatever a previous failed attempt left
//! behind. Recipes that care must clean them in their own hooks.

use crate::error::{Error, Result};
use crate::recipe::format::Atom;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-workspace lock file
pub const LOCK_FILE_NAME: &str = ".lock";

/// The directories of one package workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    /// `<root>/<name>/<version>-<release>`
    pub root: PathBuf,
    pub source: PathBuf,
    pub build: PathBuf,
    pub package: PathBuf,
    pub artifacts: PathBuf,
}

impl WorkspacePaths {
    /// Derive the workspace of `atom` under `workspace_root`
    pub fn for_atom(workspace_root: &Path, atom: &Atom) -> Self {
        let root = workspace_root.join(atom.workspace_dir());
        Self {
            source: root.join("source"),
            build: root.join("build"),
            package: root.join("package"),
            artifacts: root.join("artifacts"),
            root,
        }
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Ensure the workspace root exists
    pub fn ensure_root(&self) -> Result<()> {
        create_dir(&self.root)
    }

    /// Set up the directories for a new build attempt
    pub fn prepare(&self) -> Result<()> {
        self.ensure_root()?;

        if self.source.exists() {
            debug!("Removing old source directory {}", self.source.display());
            fs::remove_dir_all(&self.source).map_err(|e| {
                Error::IoError(format!(
                    "Failed to remove {}: {}",
                    self.source.display(),
                    e
                ))
            })?;
        }

        create_dir(&self.source)?;
        create_dir(&self.build)?;
        create_dir(&self.package)?;
        create_dir(&self.artifacts)?;

        debug!("Prepared workspace {}", self.root.display());
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", path.display(), e)))
}
