// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use alpaca::recipe::kitchen::{
    HookInvocation, HookRunner, RecipeHook, ShellHookRunner, SourceDownloader,
};
use alpaca::recipe::parse_recipe_file;
use alpaca::{Atom, Error, Kitchen, KitchenConfig, RecipeDescription, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

/// A scratch area with a workspace root, a recipe directory and a repository.
///
/// Keep the value alive for the duration of the test to prevent cleanup.
pub struct Fixture {
    pub temp: TempDir,
    pub workspace: PathBuf,
    pub recipes: PathBuf,
    pub repository: PathBuf,
    pub downloader: Arc<LocalDownloader>,
    pub hooks: Arc<RecordingHookRunner>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let workspace = temp.path().join("workspace");
        let recipes = temp.path().join("recipes/foo");
        let repository = temp.path().join("repository");
        fs::create_dir_all(&recipes).unwrap();
        fs::create_dir_all(&repository).unwrap();

        Self {
            temp,
            workspace,
            recipes,
            repository,
            downloader: Arc::new(LocalDownloader::default()),
            hooks: Arc::new(RecordingHookRunner::default()),
        }
    }

    /// Kitchen over this fixture, with the local downloader and recording hook runner
    pub fn kitchen(&self) -> Kitchen {
        let config = KitchenConfig::for_workspace(&self.workspace)
            .with_repositories(vec![self.repository.clone()])
            .quiet();

        Kitchen::new(config)
            .unwrap()
            .with_downloader(self.downloader.clone())
            .with_hook_runner(self.hooks.clone())
    }

    /// Write `foo-1.2.sh` into the recipe directory and parse it
    pub fn recipe(&self, body: &str) -> RecipeDescription {
        let path = self.recipes.join("foo-1.2.sh");
        fs::write(&path, body).unwrap();
        parse_recipe_file(&Atom::new("foo", "1.2", "0"), &path).unwrap()
    }

    /// Write a gzip tarball with `files` to `path` and return its sha256
    pub fn tarball(&self, path: &Path, files: &[(&str, &str)]) -> String {
        write_tarball(path, files);
        alpaca::hash::sha256_file(path).unwrap()
    }

    /// A file outside every search location, for the downloader to serve
    pub fn remote_file(&self, name: &str) -> PathBuf {
        let dir = self.temp.path().join("remote");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }
}

/// Write a gzip-compressed tarball holding `files` as (path, content)
pub fn write_tarball(path: &Path, files: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    let encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// Recipe with all four hooks; packaging copies `foo-1.2/foo` from the sources
pub fn full_recipe(sources: &[&str], sums: &[&str]) -> String {
    let quoted = |items: &[&str]| {
        items
            .iter()
            .map(|item| format!("\"{}\"", item))
            .collect::<Vec<_>>()
            .join(" ")
    };

    format!(
        r#"url="https://example.org/foo"
licenses=("MIT")
sources=({sources})
sha256sums=({sums})
available_options=("docs")

handle_sources() {{
    echo sources >> "$working_directory/phases.log"
}}

handle_build() {{
    echo build >> "$working_directory/phases.log"
}}

handle_check() {{
    echo check >> "$working_directory/phases.log"
}}

handle_package() {{
    echo package >> "$working_directory/phases.log"
    mkdir -p "$package_directory/usr/bin"
    cp "$source_directory/foo-1.2/foo" "$package_directory/usr/bin/foo"
    echo "${{option_docs:-0}}" > "$package_directory/docs-enabled"
}}
"#,
        sources = quoted(sources),
        sums = quoted(sums),
    )
}

/// Serves URLs from local files and records every request
#[derive(Default)]
pub struct LocalDownloader {
    files: Mutex<HashMap<String, PathBuf>>,
    requests: Mutex<Vec<String>>,
}

impl LocalDownloader {
    pub fn serve(&self, url: &str, file: &Path) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), file.to_path_buf());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl SourceDownloader for LocalDownloader {
    fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        self.requests.lock().unwrap().push(url.to_string());

        let file = self
            .files
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::DownloadError(format!("HTTP 404 for {}", url)))?;
        Ok(fs::copy(file, dest)?)
    }
}

/// Runs hooks in bash and records every hook the Kitchen asked for
#[derive(Default)]
pub struct RecordingHookRunner {
    inner: ShellHookRunner,
    requested: Mutex<Vec<RecipeHook>>,
}

impl RecordingHookRunner {
    pub fn requested(&self) -> Vec<RecipeHook> {
        self.requested.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.requested.lock().unwrap().clear();
    }
}

impl HookRunner for RecordingHookRunner {
    fn try_invoke(&self, hook: RecipeHook, invocation: &HookInvocation) -> Result<bool> {
        self.requested.lock().unwrap().push(hook);
        self.inner.try_invoke(hook, invocation)
    }
}

/// Contents of the phases log the test recipes write into the workspace
pub fn phases(workspace_root: &Path) -> Vec<String> {
    fs::read_to_string(workspace_root.join("phases.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
