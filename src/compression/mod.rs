// src/compression/mod.rs
//! Compression detection and decoding for source archives
//!
//! Source tarballs arrive as plain tar, gzip, xz or zstd. The format is
//! always decided from magic bytes, never from the file name: recipes
//! routinely point at URLs whose last segment says nothing useful.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of leading bytes needed to recognise any supported format
const MAGIC_PROBE_LEN: usize = 6;

/// Size of a tar header block
pub const TAR_BLOCK_LEN: usize = 512;

/// Offset of the `ustar` magic inside a tar header block
const USTAR_MAGIC_OFFSET: usize = 257;

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw data)
    None,
    /// Gzip compression
    Gzip,
    /// XZ/LZMA compression
    Xz,
    /// Zstandard compression
    Zstd,
}

impl CompressionFormat {
    /// Detect compression format from magic bytes
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00` (FD + "7zXZ" + NUL)
    /// - Zstd: `28 b5 2f fd`
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if data.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Self::Zstd
        } else {
            Self::None
        }
    }

    /// Detect the compression format of a file on disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let read_error =
            |e: std::io::Error| Error::IoError(format!("Failed to read {}: {}", path.display(), e));
        let mut file = File::open(path).map_err(read_error)?;
        let mut magic = Vec::with_capacity(MAGIC_PROBE_LEN);
        file.by_ref()
            .take(MAGIC_PROBE_LEN as u64)
            .read_to_end(&mut magic)
            .map_err(read_error)?;
        Ok(Self::from_magic_bytes(&magic))
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create a decompressing reader for the given format
///
/// For `CompressionFormat::None` the reader is returned unchanged.
pub fn create_decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> Result<Box<dyn Read + 'a>> {
    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        CompressionFormat::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::new(reader).map_err(|e| {
                Error::ArchiveError(format!("Failed to create zstd decoder: {}", e))
            })?;
            Ok(Box::new(decoder))
        }
    }
}

/// Open a file and wrap it in the decoder its magic bytes call for
pub fn open_decoded(path: &Path) -> Result<(CompressionFormat, Box<dyn Read>)> {
    let format = CompressionFormat::from_file(path)?;
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    Ok((format, create_decoder(file, format)?))
}

/// Check whether a 512-byte block looks like a POSIX or GNU tar header
pub fn is_tar_header(block: &[u8]) -> bool {
    block.len() >= USTAR_MAGIC_OFFSET + 5
        && &block[USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + 5] == b"ustar"
}

/// Detect whether `path` is a (possibly compressed) tar archive
///
/// Returns the compression layer when it is, `None` otherwise. A file
/// that claims a compression format but fails to decode is not an
/// archive.
pub fn detect_tarball(path: &Path) -> Result<Option<CompressionFormat>> {
    let (format, decoder) = open_decoded(path)?;

    let mut header = Vec::with_capacity(TAR_BLOCK_LEN);
    if let Err(e) = decoder.take(TAR_BLOCK_LEN as u64).read_to_end(&mut header) {
        debug!("{} does not decode as {}: {}", path.display(), format, e);
        return Ok(None);
    }

    if is_tar_header(&header) {
        Ok(Some(format))
    } else {
        Ok(None)
    }
}
