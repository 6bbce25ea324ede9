// src/recipe/kitchen/mod.rs

//! Kitchen: where recipes are cooked into binary packages
//!
//! The Kitchen owns everything that stays the same across build attempts:
//! the configuration, the downloader used for remote sources and the
//! runner used for recipe hooks. Each call to [`Kitchen::cook`] starts a
//! fresh [`Cook`], which:
//! - prepares and locks the package workspace
//! - reuses the binary archive if its fingerprint is cached and intact
//! - otherwise fetches and verifies sources, runs `handle_sources`,
//!   `handle_build`, `handle_check`, `handle_package`, and stores the
//!   package tree as a new binary archive

mod archive;
mod config;
mod cook;
pub mod hooks;
pub mod sources;
pub mod workspace;

pub use archive::{HttpDownloader, SourceDownloader, extract_archive, parse_source_url};
pub use config::{BuildConfiguration, CookResult, KitchenConfig};
pub use cook::{Cook, CookState};
pub use hooks::{HookInvocation, HookRunner, RecipeHook, ShellHookRunner};
pub use sources::{AcquiredSource, SourceFetcher, SourceOrigin};
pub use workspace::WorkspacePaths;

use crate::error::Result;
use crate::recipe::cache::BinaryCache;
use crate::recipe::format::{BuildOptions, RecipeDescription};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    pub(crate) downloader: Arc<dyn SourceDownloader>,
    pub(crate) hook_runner: Arc<dyn HookRunner>,
}

impl Kitchen {
    /// Create a Kitchen that downloads over HTTP and runs hooks in bash
    pub fn new(config: KitchenConfig) -> Result<Self> {
        let downloader = HttpDownloader::new(config.show_download_progress)?;
        Ok(Self {
            config,
            downloader: Arc::new(downloader),
            hook_runner: Arc::new(ShellHookRunner),
        })
    }

    /// Replace the source downloader
    pub fn with_downloader(mut self, downloader: Arc<dyn SourceDownloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Replace the recipe hook runner
    pub fn with_hook_runner(mut self, hook_runner: Arc<dyn HookRunner>) -> Self {
        self.hook_runner = hook_runner;
        self
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Workspace directories of a recipe
    pub fn workspace(&self, recipe: &RecipeDescription) -> WorkspacePaths {
        WorkspacePaths::for_atom(&self.config.workspace_root, &recipe.atom)
    }

    /// Fingerprint inputs for cooking `recipe` with `options`
    pub fn build_configuration(
        &self,
        recipe: &RecipeDescription,
        options: &BuildOptions,
    ) -> BuildConfiguration {
        BuildConfiguration {
            atom: recipe.atom.clone(),
            recipe_path: recipe.recipe_path.clone(),
            options: options.clone(),
            target_architecture: self.config.target_architecture.clone(),
            build_flags: self.config.build_flags.clone(),
        }
    }

    /// Current binary fingerprint of `recipe` with `options`
    pub fn fingerprint(&self, recipe: &RecipeDescription, options: &BuildOptions) -> Result<String> {
        BinaryCache::fingerprint(&self.build_configuration(recipe, options))
    }

    /// Cook a recipe
    ///
    /// Unless `force_from_source` is set, an intact binary archive with the
    /// same fingerprint is unpacked into the package directory and no
    /// recipe hook runs at all.
    pub fn cook(
        &self,
        recipe: &RecipeDescription,
        options: &BuildOptions,
        force_from_source: bool,
    ) -> Result<CookResult> {
        info!("Building package {}...", recipe.atom);

        for name in options.keys().filter(|name| !recipe.offers_option(name)) {
            warn!(
                "Option \"{}\" is not offered by {}. Passing it anyway.",
                name, recipe.atom
            );
        }

        Cook::new(self, recipe, options, force_from_source).run()
    }

    /// Describe a recipe together with its build configuration
    pub fn describe(&self, recipe: &RecipeDescription, options: &BuildOptions) -> Result<PackageInfo> {
        Ok(PackageInfo {
            recipe: recipe.clone(),
            options: options.clone(),
            fingerprint: self.fingerprint(recipe, options)?,
        })
    }
}

/// Recipe metadata plus the fingerprint it would build under
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub recipe: RecipeDescription,
    pub options: BuildOptions,
    pub fingerprint: String,
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipe = &self.recipe;
        writeln!(f, "Package Information")?;
        writeln!(f, "  Name: {}", recipe.atom.name)?;
        writeln!(f, "  Atom: {}", recipe.atom)?;
        writeln!(f, "  URL: {}", recipe.url)?;
        writeln!(f, "  Licenses: {}", recipe.licenses.join(", "))?;
        writeln!(f, "  Dependencies: {}", recipe.dependencies.join(", "))?;
        writeln!(f, "  Build Dependencies: {}", recipe.build_dependencies.join(", "))?;
        writeln!(f, "  Sources:")?;
        for (source, sum) in recipe.checksummed_sources() {
            writeln!(f, "    {} ({})", source, sum)?;
        }
        writeln!(f, "  Available options: {}", recipe.available_options.join(", "))?;
        writeln!(f)?;
        writeln!(f, "Package Configuration")?;
        let options: Vec<String> = self
            .options
            .iter()
            .map(|(name, enabled)| format!("{}={}", name, enabled))
            .collect();
        writeln!(f, "  Options: {}", options.join(", "))?;
        write!(f, "  Binary Hash: {}", self.fingerprint)
    }
}
