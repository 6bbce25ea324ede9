// src/commands/install.rs

//! Install command - resolve a recipe and cook it

use super::build_options;
use crate::cli::OptionArgs;
use alpaca::{Config, Kitchen, KitchenConfig, PackageRepository};
use anyhow::{Context, Result};
use tracing::info;

/// Resolve `package` in the configured repositories and build it
///
/// The binary cache is used unless `build_from_source` is set.
pub fn cmd_install(
    config: &Config,
    package: &str,
    build_from_source: bool,
    option_args: &OptionArgs,
) -> Result<()> {
    let options = build_options(option_args)?;

    let mut repository = PackageRepository::from_config(config);
    let recipe = repository
        .find_package(package)
        .with_context(|| format!("Failed to resolve package {}", package))?;

    let kitchen = Kitchen::new(KitchenConfig::from(config))
        .context("Failed to set up the kitchen")?;

    let result = kitchen.cook(&recipe, &options, build_from_source)?;

    if result.from_cache {
        info!("{} installed from binary cache", result.atom);
    } else {
        info!(
            "{} built from source ({} hook(s) run)",
            result.atom,
            result.hooks_invoked.len()
        );
    }
    println!("Package directory: {}", result.package_dir.display());
    println!("Binary archive:    {}", result.archive_path.display());

    Ok(())
}
