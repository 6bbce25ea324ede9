// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use crate::config::{BuildFlags, Config};
use crate::recipe::format::{Atom, BuildOptions};
use std::path::PathBuf;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Root under which per-package workspaces are created
    pub workspace_root: PathBuf,
    /// Repository roots, searched in order for repository-relative sources
    pub repositories: Vec<PathBuf>,
    pub target_architecture: String,
    pub target_platform: String,
    /// Flags exported to every recipe hook
    pub build_flags: BuildFlags,
    /// Do not echo build/check/package hook output
    pub suppress_build_output: bool,
    /// Draw a progress bar while downloading sources
    pub show_download_progress: bool,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for KitchenConfig {
    fn from(config: &Config) -> Self {
        Self {
            workspace_root: config.workspace_path(),
            repositories: config.repository_paths(),
            target_architecture: config.environment.target_architecture.clone(),
            target_platform: config.environment.target_platform.clone(),
            build_flags: config.build.clone(),
            suppress_build_output: config.general.suppress_build_output,
            show_download_progress: config.general.show_download_progress,
        }
    }
}

impl KitchenConfig {
    /// Configuration rooted at `workspace_root` with no repositories
    pub fn for_workspace(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            repositories: Vec::new(),
            ..Self::default()
        }
    }

    /// Set the repository roots
    pub fn with_repositories(mut self, repositories: Vec<PathBuf>) -> Self {
        self.repositories = repositories;
        self
    }

    /// Disable echoing of hook output and download progress
    pub fn quiet(mut self) -> Self {
        self.suppress_build_output = true;
        self.show_download_progress = false;
        self
    }
}

/// Inputs of one build attempt that decide its binary fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub atom: Atom,
    pub recipe_path: PathBuf,
    pub options: BuildOptions,
    pub target_architecture: String,
    pub build_flags: BuildFlags,
}

/// Result of cooking a recipe
#[derive(Debug, Clone)]
pub struct CookResult {
    pub atom: Atom,
    /// Binary fingerprint of the build configuration
    pub fingerprint: String,
    /// Binary archive in the workspace's artifacts directory
    pub archive_path: PathBuf,
    /// Directory holding the installed package tree
    pub package_dir: PathBuf,
    /// Whether the package tree came from the binary cache
    pub from_cache: bool,
    /// Recipe hooks that were actually invoked, in order
    pub hooks_invoked: Vec<String>,
    /// Local paths of the acquired sources
    pub sources: Vec<PathBuf>,
}
