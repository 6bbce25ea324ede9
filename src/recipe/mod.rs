// src/recipe/mod.rs

//! Recipe system for building packages from source
//!
//! Recipes are bash scripts that declare package metadata and optional
//! lifecycle hooks. See [`format`] for the layout of a recipe.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build script for one package version
//! - **Kitchen**: Shared build setup (workspace root, downloader, hook runner)
//! - **Cook**: One build attempt, from workspace preparation to binary archive
//! - **Ingredients**: Source archives and patches

pub mod cache;
pub mod format;
pub mod kitchen;
pub mod parser;

pub use cache::{BinaryCache, CacheLookup};
pub use format::{Atom, BuildOptions, RecipeDescription};
pub use kitchen::{
    BuildConfiguration, Cook, CookResult, CookState, Kitchen, KitchenConfig, PackageInfo,
};
pub use parser::{parse_recipe_file, validate_description};
