// src/recipe/kitchen/archive.rs

//! Download and extraction utilities for the Kitchen

use crate::compression::{create_decoder, detect_tarball};
use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Connect timeout for source downloads; the transfer itself is unbounded
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Fetches a remote source to a local file
///
/// The Kitchen only ever talks to the network through this trait, so
/// tests can substitute a local fake.
pub trait SourceDownloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written
    fn download(&self, url: &Url, dest: &Path) -> Result<u64>;
}

/// Interpret a source locator as a downloadable URL
///
/// Only `http` and `https` count; anything else is treated as a path.
pub fn parse_source_url(locator: &str) -> Option<Url> {
    let url = Url::parse(locator).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// File name a downloaded source is stored under
pub fn file_name_for_url(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| Error::DownloadError(format!("Cannot derive a file name from {}", url)))
}

/// HTTP(S) downloader using reqwest
pub struct HttpDownloader {
    client: Client,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(show_progress: bool) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            show_progress,
        })
    }

    fn progress_bar(&self, total_size: u64, name: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(total_size);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(name.to_string());
        Some(pb)
    }
}

impl SourceDownloader for HttpDownloader {
    fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let pb = self.progress_bar(total_size, &name);

        let mut file = File::create(dest)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dest.display(), e)))?;

        let result = stream_response_to_file(response, &mut file, pb.as_ref());
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        match result {
            Ok(bytes) => {
                debug!("Downloaded {} bytes to {}", bytes, dest.display());
                Ok(bytes)
            }
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(dest);
                Err(e)
            }
        }
    }
}

/// Stream an HTTP response to a file in fixed-size chunks
fn stream_response_to_file(
    mut response: reqwest::blocking::Response,
    file: &mut File,
    progress_bar: Option<&ProgressBar>,
) -> Result<u64> {
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("Failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::IoError(format!("Failed to write data: {e}")))?;

        downloaded += bytes_read as u64;

        if let Some(pb) = progress_bar {
            pb.set_position(downloaded);
        }
    }

    file.flush()
        .map_err(|e| Error::IoError(format!("Failed to flush data: {e}")))?;
    Ok(downloaded)
}

/// Extract `archive` into `dest` if it is a tarball
///
/// Returns `false` and leaves the file alone when it is not an archive.
/// A file that is recognised as a tarball but fails to unpack is an error.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<bool> {
    let Some(format) = detect_tarball(archive)? else {
        debug!("{} is not an archive, leaving as is", archive.display());
        return Ok(false);
    };

    info!("Extracting {} ({})", archive.display(), format);

    let file = File::open(archive)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", archive.display(), e)))?;
    let decoder = create_decoder(BufReader::new(file), format)?;

    let mut tar = tar::Archive::new(decoder);
    tar.set_preserve_permissions(true);
    tar.unpack(dest).map_err(|e| {
        Error::ArchiveError(format!(
            "Failed to extract {}: {}",
            archive.display(),
            e
        ))
    })?;

    Ok(true)
}
