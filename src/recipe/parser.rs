// src/recipe/parser.rs

//! Recipe metadata extraction
//!
//! Recipes are bash, so the only faithful way to read their metadata is to
//! let bash evaluate them. The recipe is sourced once in a throwaway shell
//! and every known variable is printed back as NUL-terminated
//! `field<TAB>value` records, one per array element.

use crate::error::{Error, Result};
use crate::recipe::format::{Atom, RecipeDescription};
use crate::shell::{ShellCommand, quote_path};
use std::path::Path;
use tracing::debug;

/// Shell variables read from a recipe, in output order
const RECIPE_FIELDS: &[&str] = &[
    "url",
    "licenses",
    "dependencies",
    "build_dependencies",
    "sources",
    "sha256sums",
    "available_options",
];

/// Build the bash snippet that dumps the recipe's metadata
fn dump_script(recipe: &Path) -> Result<String> {
    Ok(format!(
        "source {} >/dev/null || exit 1\n\
         for __alpaca_field in {}; do\n\
         \x20   declare -n __alpaca_ref=\"$__alpaca_field\"\n\
         \x20   for __alpaca_value in \"${{__alpaca_ref[@]}}\"; do\n\
         \x20       printf '%s\\t%s\\0' \"$__alpaca_field\" \"$__alpaca_value\"\n\
         \x20   done\n\
         \x20   unset -n __alpaca_ref\n\
         done",
        quote_path(recipe)?,
        RECIPE_FIELDS.join(" ")
    ))
}

/// Read the description of the recipe at `path`
///
/// The atom is supplied by the caller (it comes from package resolution,
/// not from the recipe body).
pub fn parse_recipe_file(atom: &Atom, path: &Path) -> Result<RecipeDescription> {
    if !path.is_file() {
        return Err(Error::ParseError(format!(
            "Recipe file not found: {}",
            path.display()
        )));
    }

    debug!("Reading recipe metadata from {}", path.display());

    let dump = ShellCommand::new(dump_script(path)?)
        .echo_output(false)
        .fail_on_error(true)
        .run()
        .map_err(|e| match e {
            Error::CommandFailed { stderr, .. } => Error::ParseError(format!(
                "Failed to source recipe {}: {}",
                path.display(),
                stderr.trim()
            )),
            other => other,
        })?;

    let mut description = RecipeDescription {
        atom: atom.clone(),
        url: String::new(),
        licenses: Vec::new(),
        dependencies: Vec::new(),
        build_dependencies: Vec::new(),
        sources: Vec::new(),
        sha256sums: Vec::new(),
        available_options: Vec::new(),
        recipe_path: path.to_path_buf(),
    };

    for record in dump.stdout.split('\0').filter(|r| !r.is_empty()) {
        let (field, value) = record.split_once('\t').ok_or_else(|| {
            Error::ParseError(format!("Malformed recipe metadata record: {:?}", record))
        })?;
        let value = value.to_string();

        match field {
            "url" => description.url = value,
            "licenses" => description.licenses.push(value),
            "dependencies" => description.dependencies.push(value),
            "build_dependencies" => description.build_dependencies.push(value),
            "sources" => description.sources.push(value),
            "sha256sums" => description.sha256sums.push(value),
            "available_options" => description.available_options.push(value),
            other => {
                return Err(Error::ParseError(format!(
                    "Unexpected recipe field: {}",
                    other
                )));
            }
        }
    }

    validate_description(&description)?;
    Ok(description)
}

/// Check cross-field constraints of a parsed description
pub fn validate_description(description: &RecipeDescription) -> Result<()> {
    if description.sources.len() != description.sha256sums.len() {
        return Err(Error::ParseError(format!(
            "Recipe {} declares {} sources but {} sha256sums",
            description.recipe_path.display(),
            description.sources.len(),
            description.sha256sums.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_recipe(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("foo-1.2.sh");
        fs::write(&path, body).unwrap();
        path
    }

    fn atom() -> Atom {
        Atom::new("foo", "1.2", "0")
    }

    #[test]
    fn test_parse_full_recipe() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            r#"
url="https://example.org/foo"
licenses=("MIT" "Apache-2.0")
dependencies=("glibc")
build_dependencies=("make" "gcc")
sources=("https://example.org/foo-1.2.tar.gz" "fix build.patch")
sha256sums=("AAAA" "bbbb")
available_options=("docs")
echo "noise on stdout"

handle_build() {
    make
}
"#,
        );

        let description = parse_recipe_file(&atom(), &path).unwrap();
        assert_eq!(description.atom, atom());
        assert_eq!(description.url, "https://example.org/foo");
        assert_eq!(description.licenses, vec!["MIT", "Apache-2.0"]);
        assert_eq!(description.dependencies, vec!["glibc"]);
        assert_eq!(description.build_dependencies, vec!["make", "gcc"]);
        assert_eq!(
            description.sources,
            vec!["https://example.org/foo-1.2.tar.gz", "fix build.patch"]
        );
        assert_eq!(description.sha256sums, vec!["AAAA", "bbbb"]);
        assert_eq!(description.available_options, vec!["docs"]);
        assert_eq!(description.recipe_path, path);
    }

    #[test]
    fn test_parse_minimal_recipe() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(&dir, "handle_package() { :; }\n");

        let description = parse_recipe_file(&atom(), &path).unwrap();
        assert!(description.url.is_empty());
        assert!(description.sources.is_empty());
        assert!(description.available_options.is_empty());
    }

    #[test]
    fn test_recipe_can_use_its_own_variables() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(
            &dir,
            "version=1.2\nsources=(\"https://example.org/foo-${version}.tar.xz\")\nsha256sums=(\"cc\")\n",
        );

        let description = parse_recipe_file(&atom(), &path).unwrap();
        assert_eq!(description.sources, vec!["https://example.org/foo-1.2.tar.xz"]);
    }

    #[test]
    fn test_mismatched_checksum_count() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(&dir, "sources=(\"a\" \"b\")\nsha256sums=(\"aa\")\n");

        let err = parse_recipe_file(&atom(), &path).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_broken_recipe() {
        let dir = TempDir::new().unwrap();
        let path = write_recipe(&dir, "sources=(\"a\"\nfalse\n");

        let err = parse_recipe_file(&atom(), &path).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_missing_recipe() {
        let err = parse_recipe_file(&atom(), Path::new("/nonexistent/foo-1.2.sh")).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }
}
