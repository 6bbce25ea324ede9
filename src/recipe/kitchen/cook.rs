// src/recipe/kitchen/cook.rs

//! Cook: one build attempt for a single recipe
//!
//! ```text
//! Prepare -> CacheCheck -> ExtractCached ------------------------> Done
//!    |           |
//!    |           +-> FetchSources -> Build -> Check -> Package -> Done
//!    +-- forced ----^
//! ```
//!
//! Any error moves the cook to `Failed` and is returned wrapped in
//! [`Error::PhaseFailed`]. A `Cook` is consumed by [`Cook::run`]; a new
//! attempt needs a new `Cook`.

use super::Kitchen;
use super::config::{BuildConfiguration, CookResult};
use super::hooks::{self, RecipeHook};
use super::sources::SourceFetcher;
use super::workspace::WorkspacePaths;
use crate::error::{Error, Result};
use crate::lock::WorkspaceLock;
use crate::recipe::cache::{BinaryCache, CacheLookup};
use crate::recipe::format::{BuildOptions, RecipeDescription};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// States of a build attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookState {
    Prepare,
    CacheCheck,
    ExtractCached,
    FetchSources,
    Build,
    Check,
    Package,
    Done,
    Failed,
}

impl CookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::CacheCheck => "cache check",
            Self::ExtractCached => "extract cached",
            Self::FetchSources => "fetch sources",
            Self::Build => "build",
            Self::Check => "check",
            Self::Package => "package",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for CookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cook operation
pub struct Cook<'a> {
    kitchen: &'a Kitchen,
    recipe: &'a RecipeDescription,
    options: &'a BuildOptions,
    force_from_source: bool,
    paths: WorkspacePaths,
    cache: BinaryCache,
    state: CookState,
    /// States entered so far, in order
    history: Vec<CookState>,
    fingerprint: Option<String>,
    archive_path: Option<PathBuf>,
    from_cache: bool,
    hooks_invoked: Vec<String>,
    sources: Vec<PathBuf>,
    /// Held from `Prepare` until the cook is dropped
    _lock: Option<WorkspaceLock>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(
        kitchen: &'a Kitchen,
        recipe: &'a RecipeDescription,
        options: &'a BuildOptions,
        force_from_source: bool,
    ) -> Self {
        let paths = WorkspacePaths::for_atom(&kitchen.config.workspace_root, &recipe.atom);
        let cache = BinaryCache::new(&paths.artifacts);

        Self {
            kitchen,
            recipe,
            options,
            force_from_source,
            paths,
            cache,
            state: CookState::Prepare,
            history: Vec::new(),
            fingerprint: None,
            archive_path: None,
            from_cache: false,
            hooks_invoked: Vec::new(),
            sources: Vec::new(),
            _lock: None,
        }
    }

    pub fn state(&self) -> CookState {
        self.state
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Drive the state machine to `Done` or `Failed`
    pub fn run(mut self) -> Result<CookResult> {
        let atom = self.recipe.atom.to_string();

        while !self.state.is_terminal() {
            let current = self.state;
            self.history.push(current);
            debug!("{}: {}", atom, current);

            match self.step(current) {
                Ok(next) => self.state = next,
                Err(e) => {
                    self.state = CookState::Failed;
                    debug!("{}: {} failed: {}", atom, current, e);
                    return Err(e.in_phase(&atom, current));
                }
            }
        }

        self.history.push(self.state);
        debug!("{}: {:?}", atom, self.history);
        self.finish()
    }

    fn step(&mut self, state: CookState) -> Result<CookState> {
        match state {
            CookState::Prepare => self.prepare(),
            CookState::CacheCheck => self.cache_check(),
            CookState::ExtractCached => self.extract_cached(),
            CookState::FetchSources => self.fetch_sources(),
            CookState::Build => {
                info!("Building package...");
                let echo = self.echo_build_output();
                self.invoke_hook(RecipeHook::HandleBuild, self.paths.build.clone(), echo)?;
                Ok(CookState::Check)
            }
            CookState::Check => {
                info!("Checking package...");
                let echo = self.echo_build_output();
                self.invoke_hook(RecipeHook::HandleCheck, self.paths.build.clone(), echo)?;
                Ok(CookState::Package)
            }
            CookState::Package => self.package(),
            CookState::Done | CookState::Failed => Ok(state),
        }
    }

    fn prepare(&mut self) -> Result<CookState> {
        self.paths.ensure_root()?;

        let lock = WorkspaceLock::try_acquire(self.paths.lock_file())?
            .ok_or_else(|| Error::WorkspaceLocked(self.recipe.atom.to_string()))?;
        self._lock = Some(lock);

        self.paths.prepare()?;

        if self.force_from_source {
            info!("Forcing build from source. Ignoring binary cache.");
            Ok(CookState::FetchSources)
        } else {
            Ok(CookState::CacheCheck)
        }
    }

    fn cache_check(&mut self) -> Result<CookState> {
        let fingerprint = BinaryCache::fingerprint(&self.build_configuration())?;

        let next = match self.cache.lookup(&fingerprint)? {
            CacheLookup::Hit(archive) => {
                info!("Binary cache hash matches. Skipping build.");
                self.archive_path = Some(archive);
                CookState::ExtractCached
            }
            CacheLookup::Miss => {
                info!("No binary cache for {}. Building from source.", self.recipe.atom);
                CookState::FetchSources
            }
            CacheLookup::Corrupt(archive) => {
                warn!(
                    "Binary cache hash mismatch for {}. Rebuilding...",
                    archive.display()
                );
                CookState::FetchSources
            }
        };

        self.fingerprint = Some(fingerprint);
        Ok(next)
    }

    fn extract_cached(&mut self) -> Result<CookState> {
        let archive = self
            .archive_path
            .clone()
            .ok_or_else(|| Error::IoError("No cached archive to extract".to_string()))?;

        self.cache.restore(&archive, &self.paths.package)?;
        self.from_cache = true;
        Ok(CookState::Done)
    }

    fn fetch_sources(&mut self) -> Result<CookState> {
        info!("Handle sources...");

        let fetcher = SourceFetcher::new(
            self.kitchen.downloader.as_ref(),
            self.recipe.recipe_directory(),
            &self.kitchen.config.repositories,
            &self.paths.source,
        );

        // First failure aborts, later sources are never touched
        for (locator, checksum) in self.recipe.checksummed_sources() {
            let acquired = fetcher.acquire(locator, checksum)?;
            self.sources.push(acquired.path);
        }

        self.invoke_hook(RecipeHook::HandleSources, self.paths.source.clone(), true)?;
        Ok(CookState::Build)
    }

    fn package(&mut self) -> Result<CookState> {
        info!("Packaging package...");
        let echo = self.echo_build_output();
        self.invoke_hook(RecipeHook::HandlePackage, self.paths.build.clone(), echo)?;

        // Recomputed: the recipe may have changed since the cache check
        let fingerprint = BinaryCache::fingerprint(&self.build_configuration())?;
        let archive = self.cache.store(&self.paths.package, &fingerprint)?;

        self.fingerprint = Some(fingerprint);
        self.archive_path = Some(archive);
        Ok(CookState::Done)
    }

    fn invoke_hook(&mut self, hook: RecipeHook, working_dir: PathBuf, echo_output: bool) -> Result<()> {
        let invocation = hooks::invocation(
            &self.recipe.recipe_path,
            &working_dir,
            &self.environment(),
            echo_output,
        );

        if self.kitchen.hook_runner.try_invoke(hook, &invocation)? {
            self.hooks_invoked.push(hook.function_name().to_string());
        }
        Ok(())
    }

    fn echo_build_output(&self) -> bool {
        !self.kitchen.config.suppress_build_output
    }

    fn build_configuration(&self) -> BuildConfiguration {
        self.kitchen.build_configuration(self.recipe, self.options)
    }

    /// Variables exported to every recipe hook
    fn environment(&self) -> BTreeMap<String, String> {
        let config = &self.kitchen.config;
        let atom = &self.recipe.atom;
        let mut env = BTreeMap::new();

        for (name, _) in self.options.iter().filter(|(_, enabled)| **enabled) {
            env.insert(format!("option_{}", name.to_lowercase()), "1".to_string());
        }

        let dirs = [
            ("working_directory", &self.paths.root),
            ("source_directory", &self.paths.source),
            ("build_directory", &self.paths.build),
            ("package_directory", &self.paths.package),
        ];
        for (key, path) in dirs {
            env.insert(key.to_string(), path.to_string_lossy().into_owned());
        }

        env.insert("target_architecture".to_string(), config.target_architecture.clone());
        env.insert("target_platform".to_string(), config.target_platform.clone());
        env.insert("package_atom".to_string(), atom.to_string());
        env.insert("package_version".to_string(), atom.version.clone());
        env.insert("package_build".to_string(), atom.release.clone());

        let flags = &config.build_flags;
        env.insert("c_flags".to_string(), flags.c_flags.clone());
        env.insert("cpp_flags".to_string(), flags.cpp_flags.clone());
        env.insert("ld_flags".to_string(), flags.ld_flags.clone());
        env.insert("make_flags".to_string(), flags.make_flags.clone());
        env.insert("ninja_flags".to_string(), flags.ninja_flags.clone());

        env
    }

    fn finish(self) -> Result<CookResult> {
        let fingerprint = self
            .fingerprint
            .ok_or_else(|| Error::IoError("Build finished without a fingerprint".to_string()))?;
        let archive_path = self
            .archive_path
            .ok_or_else(|| Error::IoError("Build finished without an archive".to_string()))?;

        if self.from_cache {
            info!("Installed {} from binary cache", self.recipe.atom);
        } else {
            info!("Built {} ({})", self.recipe.atom, archive_path.display());
        }

        Ok(CookResult {
            atom: self.recipe.atom.clone(),
            fingerprint,
            archive_path,
            package_dir: self.paths.package.clone(),
            from_cache: self.from_cache,
            hooks_invoked: self.hooks_invoked,
            sources: self.sources,
        })
    }
}
