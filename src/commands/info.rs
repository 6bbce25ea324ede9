// src/commands/info.rs

//! Info command - show recipe metadata and the binary hash

use super::build_options;
use crate::cli::OptionArgs;
use alpaca::{Config, Kitchen, KitchenConfig, PackageRepository};
use anyhow::{Context, Result};

pub fn cmd_info(config: &Config, package: &str, option_args: &OptionArgs) -> Result<()> {
    let options = build_options(option_args)?;

    let mut repository = PackageRepository::from_config(config);
    let recipe = repository
        .find_package(package)
        .with_context(|| format!("Failed to resolve package {}", package))?;

    let kitchen = Kitchen::new(KitchenConfig::from(config))
        .context("Failed to set up the kitchen")?;
    let info = kitchen
        .describe(&recipe, &options)
        .with_context(|| format!("Failed to describe {}", recipe.atom))?;

    println!("{}", info);
    Ok(())
}
