// src/lib.rs

//! Alpaca source package builder
//!
//! Builds packages from bash recipes and keeps every successful build in
//! a content-addressed binary cache, so the same recipe, architecture and
//! option set is never built twice.
//!
//! # Architecture
//!
//! - Repositories: recipe trees searched by name and version ([`repository`])
//! - Recipes: bash scripts with metadata variables and optional hooks ([`recipe`])
//! - Kitchen: per-package workspaces and the build state machine ([`recipe::kitchen`])
//! - Binary cache: `<fingerprint>.tar.xz` archives with sha256 sidecars ([`recipe::cache`])
//! - Shell: bash execution with streamed, captured output ([`shell`])

pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod lock;
pub mod recipe;
pub mod repository;
pub mod shell;

pub use config::Config;
pub use error::{Error, Result};
pub use recipe::{
    Atom, BinaryCache, BuildOptions, CookResult, Kitchen, KitchenConfig, RecipeDescription,
};
pub use repository::PackageRepository;
pub use shell::{CommandOutput, ShellCommand};
