// src/config.rs

//! Configuration for alpaca
//!
//! Settings come from a single TOML file found by [`Config::discover`]:
//!
//! 1. the file named by `$ALEYA_CONFIG`
//! 2. `~/.alpaca`
//! 3. `/etc/alpaca.conf`
//! 4. `./alpaca.conf`
//!
//! The first that exists wins. Every key has a default, so an empty or
//! partial file is fine, and running without any file uses defaults.
//!
//! ```toml
//! [general]
//! suppress_build_output = false
//! show_download_progress = true
//!
//! [environment]
//! target_architecture = "x86_64"
//! target_platform = "aleya-linux-gnu"
//! workspace_path = "~/alpaca_workspace"
//!
//! [repository]
//! repositories = ["~/packages"]
//! package_streams = ["core"]
//!
//! [build]
//! c_flags = "-O2 -pipe"
//! make_flags = "-j8"
//! ```
//!
//! The loaded value is passed explicitly to the components that need it.
//!
//! Older INI-style files (`key = value` lines without quotes, with
//! `repositories` as a comma-separated list) are not TOML and fail to load
//! with [`Error::Config`]. Convert them to the layout above.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "ALEYA_CONFIG";

/// Per-user configuration file
pub const USER_CONFIG_PATH: &str = "~/.alpaca";

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/alpaca.conf";

/// Configuration file looked up in the current directory
pub const LOCAL_CONFIG_NAME: &str = "alpaca.conf";

/// Complete alpaca configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub environment: EnvironmentConfig,
    pub repository: RepositoryConfig,
    pub build: BuildFlags,
}

/// `[general]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub debug: bool,
    pub verbose: bool,
    /// Do not echo recipe build/check/package output
    pub suppress_build_output: bool,
    /// Draw a progress bar while downloading sources
    pub show_download_progress: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            suppress_build_output: false,
            show_download_progress: true,
        }
    }
}

/// `[environment]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub target_architecture: String,
    pub target_platform: String,
    /// Root under which per-package workspaces are created (`~` allowed)
    pub workspace_path: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            target_architecture: "x86_64".to_string(),
            target_platform: "aleya-linux-gnu".to_string(),
            workspace_path: "~/alpaca_workspace".to_string(),
        }
    }
}

/// `[repository]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repository roots, searched in order (`~` allowed)
    pub repositories: Vec<String>,
    /// Package streams inside each repository, searched in order
    pub package_streams: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repositories: vec!["~/packages".to_string()],
            package_streams: vec!["core".to_string()],
        }
    }
}

/// `[build]` section: compiler and build tool flags handed to recipes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFlags {
    pub c_flags: String,
    pub cpp_flags: String,
    pub ld_flags: String,
    pub make_flags: String,
    pub ninja_flags: String,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Find and load the configuration file, falling back to defaults
    pub fn discover() -> Result<Self> {
        match find_config_file() {
            Some(path) => {
                debug!("Using configuration file {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No configuration file found. Using default configuration.");
                Ok(Self::default())
            }
        }
    }

    /// Absolute workspace root with `~` expanded
    pub fn workspace_path(&self) -> PathBuf {
        expand_home(&self.environment.workspace_path)
    }

    /// Repository roots with `~` expanded, in search order
    pub fn repository_paths(&self) -> Vec<PathBuf> {
        self.repository
            .repositories
            .iter()
            .map(|r| expand_home(r))
            .collect()
    }
}

/// Locate the configuration file according to the lookup precedence
fn find_config_file() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&explicit);
        if path.exists() {
            debug!("Using configuration file specified in {}", CONFIG_ENV_VAR);
            return Some(path);
        }
        warn!(
            "Configuration file specified in {} does not exist: {}. Ignoring",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    let mut candidates = vec![expand_home(USER_CONFIG_PATH), PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(LOCAL_CONFIG_NAME));
    }

    candidates.into_iter().find(|candidate| {
        debug!("Looking for configuration file at {}", candidate.display());
        candidate.exists()
    })
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
