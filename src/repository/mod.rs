// src/repository/mod.rs

//! Recipe repositories
//!
//! A repository is a directory tree of package streams:
//!
//! ```text
//! <repository>/<stream>/recipes/<name>/latest
//! <repository>/<stream>/recipes/<name>/<name>-<version>.sh
//! <repository>/<stream>/recipes/<name>/<name>-<version>-<release>.sh
//! ```
//!
//! Repositories are searched in configured order, and inside each
//! repository the streams in configured order. The first match wins.

mod resolution;

pub use resolution::{
    AtomRequest, DEFAULT_RELEASE, LATEST_VERSION, parse_atom_request, split_version_release,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::format::{Atom, RecipeDescription};
use crate::recipe::parser::parse_recipe_file;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Looks up recipes across repositories and package streams
#[derive(Debug, Clone)]
pub struct PackageRepository {
    repositories: Vec<PathBuf>,
    streams: Vec<String>,
    /// Recipes already loaded, by atom
    loaded: HashMap<Atom, RecipeDescription>,
}

impl PackageRepository {
    pub fn new(repositories: Vec<PathBuf>, streams: Vec<String>) -> Self {
        Self {
            repositories,
            streams,
            loaded: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.repository_paths(),
            config.repository.package_streams.clone(),
        )
    }

    /// `<repository>/<stream>/recipes/<name>` for every repository and stream, in search order
    fn recipe_dirs<'a>(&'a self, name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.repositories.iter().flat_map(move |repository| {
            self.streams
                .iter()
                .map(move |stream| repository.join(stream).join("recipes").join(name))
        })
    }

    /// Read the version named by the first `latest` file for `name`
    pub fn latest_version(&self, name: &str) -> Result<String> {
        info!("Resolving latest version for package {}", name);

        for dir in self.recipe_dirs(name) {
            let latest = dir.join(LATEST_VERSION);
            if latest.is_file() {
                let version = fs::read_to_string(&latest)
                    .map_err(|e| {
                        Error::IoError(format!("Failed to read {}: {}", latest.display(), e))
                    })?
                    .trim()
                    .to_string();
                if version.is_empty() {
                    return Err(Error::ParseError(format!(
                        "Empty version in {}",
                        latest.display()
                    )));
                }
                info!("Latest version for package {} is {}", name, version);
                return Ok(version);
            }
        }

        Err(Error::PackageNotFound(name.to_string()))
    }

    /// Turn a user-supplied package string into a concrete atom
    pub fn resolve_atom(&self, input: &str) -> Result<Atom> {
        match parse_atom_request(input)? {
            AtomRequest::Exact(atom) => Ok(atom),
            AtomRequest::Latest { name } => {
                let version = self.latest_version(&name)?;
                let (version, release) = split_version_release(&version)?;
                Ok(Atom::new(name, version, release))
            }
        }
    }

    /// Locate the recipe script for `atom`
    pub fn find_recipe_path(&self, atom: &Atom) -> Result<PathBuf> {
        for dir in self.recipe_dirs(&atom.name) {
            debug!("Searching for package {} in {}", atom, dir.display());

            let candidates = [
                dir.join(format!("{}-{}.sh", atom.name, atom.version)),
                dir.join(format!("{}-{}-{}.sh", atom.name, atom.version, atom.release)),
            ];
            if let Some(found) = candidates.into_iter().find(|c| c.is_file()) {
                debug!("Found package {} in {}", atom, found.display());
                return Ok(found);
            }
        }

        Err(Error::PackageNotFound(atom.to_string()))
    }

    /// Resolve `input` and load its recipe description
    pub fn find_package(&mut self, input: &str) -> Result<RecipeDescription> {
        let atom = self.resolve_atom(input)?;

        if let Some(description) = self.loaded.get(&atom) {
            debug!("Package {} loaded from cache", atom);
            return Ok(description.clone());
        }

        let path = self.find_recipe_path(&atom)?;
        let description = parse_recipe_file(&atom, &path)?;
        self.loaded.insert(atom, description.clone());
        Ok(description)
    }
}
