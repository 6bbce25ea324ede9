// src/recipe/kitchen/hooks.rs

//! Recipe hook dispatch
//!
//! A recipe may define any of `handle_sources`, `handle_build`,
//! `handle_check` and `handle_package`. Each is optional: a missing
//! function is skipped with a log line, never an error.

use crate::error::{Error, Result};
use crate::shell::{ShellCommand, quote, quote_path};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The lifecycle hooks a recipe can define
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeHook {
    HandleSources,
    HandleBuild,
    HandleCheck,
    HandlePackage,
}

impl RecipeHook {
    /// Shell function implementing this hook
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::HandleSources => "handle_sources",
            Self::HandleBuild => "handle_build",
            Self::HandleCheck => "handle_check",
            Self::HandlePackage => "handle_package",
        }
    }
}

impl fmt::Display for RecipeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Everything needed to run one hook
#[derive(Debug, Clone)]
pub struct HookInvocation {
    pub recipe_path: PathBuf,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub echo_output: bool,
}

/// Runs recipe hooks
///
/// `try_invoke` returns `Ok(true)` if the hook existed and succeeded,
/// `Ok(false)` if the recipe does not define it.
pub trait HookRunner: Send + Sync {
    fn try_invoke(&self, hook: RecipeHook, invocation: &HookInvocation) -> Result<bool>;
}

/// Runs hooks by sourcing the recipe in bash
///
/// The recipe is sourced once per hook, in the same shell that probes for
/// the function and calls it. A missing function is reported back through
/// a marker file, so every exit code stays available to the recipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHookRunner;

impl ShellHookRunner {
    /// Script that sources the recipe and calls the hook if it is declared
    fn dispatch_script(hook: RecipeHook, recipe_path: &Path, marker: &Path) -> Result<String> {
        let function = quote(hook.function_name())?;
        Ok(format!(
            "source {recipe} || exit $?\n\
             if declare -F {function} >/dev/null; then\n\
             {function}\n\
             else\n\
             printf skipped > {marker}\n\
             fi\n",
            recipe = quote_path(recipe_path)?,
            marker = quote_path(marker)?,
        ))
    }
}

impl HookRunner for ShellHookRunner {
    fn try_invoke(&self, hook: RecipeHook, invocation: &HookInvocation) -> Result<bool> {
        let marker = NamedTempFile::new().map_err(|e| {
            Error::IoError(format!("Failed to create hook marker file: {}", e))
        })?;

        debug!(
            "Calling {} from {}",
            hook,
            invocation.working_dir.display()
        );

        ShellCommand::new(Self::dispatch_script(hook, &invocation.recipe_path, marker.path())?)
            .current_dir(&invocation.working_dir)
            .envs(invocation.env.clone())
            .echo_output(invocation.echo_output)
            .fail_on_error(true)
            .run()?;

        let skipped = fs::metadata(marker.path())
            .map_err(|e| Error::IoError(format!("Failed to read hook marker file: {}", e)))?
            .len()
            > 0;
        if skipped {
            info!("Skipping \"{}\". Function not found.", hook);
            return Ok(false);
        }

        Ok(true)
    }
}

/// Build the invocation for a hook of the recipe at `recipe_path`
pub fn invocation(
    recipe_path: &Path,
    working_dir: &Path,
    env: &BTreeMap<String, String>,
    echo_output: bool,
) -> HookInvocation {
    HookInvocation {
        recipe_path: recipe_path.to_path_buf(),
        working_dir: working_dir.to_path_buf(),
        env: env.clone(),
        echo_output,
    }
}
