// src/recipe/format.rs

//! Recipe data types
//!
//! A recipe is a bash script. Its metadata lives in well-known shell
//! variables and arrays, and its build steps in optional functions:
//!
//! ```bash
//! url="https://example.org/foo"
//! licenses=("MIT")
//! dependencies=("glibc")
//! build_dependencies=("make")
//! sources=("https://example.org/foo-1.2.tar.xz" "fix-build.patch")
//! sha256sums=("9f86d0..." "60303a...")
//! available_options=("docs")
//!
//! handle_build() {
//!     make -C "$source_directory/foo-1.2" $make_flags
//! }
//!
//! handle_package() {
//!     make -C "$source_directory/foo-1.2" DESTDIR="$package_directory" install
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Build options keyed by name; sorted so iteration order is stable
pub type BuildOptions = BTreeMap<String, bool>;

/// Identity of a buildable package instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub name: String,
    pub version: String,
    pub release: String,
}

impl Atom {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
        }
    }

    /// Relative workspace directory: `name/version-release`
    pub fn workspace_dir(&self) -> PathBuf {
        Path::new(&self.name).join(format!("{}-{}", self.version, self.release))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.name, self.version, self.release)
    }
}

/// Metadata extracted from a recipe script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDescription {
    pub atom: Atom,
    /// Upstream project URL
    pub url: String,
    pub licenses: Vec<String>,
    pub dependencies: Vec<String>,
    pub build_dependencies: Vec<String>,
    /// Source locators: URLs, absolute paths, or paths relative to the
    /// recipe directory or a repository root
    pub sources: Vec<String>,
    /// SHA-256 of each source, index-aligned with `sources`
    pub sha256sums: Vec<String>,
    pub available_options: Vec<String>,
    /// Path of the recipe script itself
    pub recipe_path: PathBuf,
}

impl RecipeDescription {
    /// Directory the recipe script lives in
    pub fn recipe_directory(&self) -> &Path {
        self.recipe_path.parent().unwrap_or(Path::new("."))
    }

    /// Sources paired with their declared checksums
    pub fn checksummed_sources(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources
            .iter()
            .map(String::as_str)
            .zip(self.sha256sums.iter().map(String::as_str))
    }

    pub fn offers_option(&self, option: &str) -> bool {
        self.available_options.iter().any(|o| o == option)
    }
}
