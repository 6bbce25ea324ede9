// src/error.rs

//! Error types for alpaca
//!
//! Every fatal condition of a build attempt is one of these variants. Errors
//! raised while a build is running are wrapped once in [`Error::PhaseFailed`]
//! so the caller knows which package and which phase broke; use
//! [`Error::root_cause`] to get at the underlying kind.

use thiserror::Error;

/// Result type used throughout alpaca
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No resolution strategy produced a file for a source locator
    #[error("Source {0} is not a valid URL or file path")]
    SourceNotFound(String),

    /// A materialized source does not hash to the declared checksum
    #[error("Source {source_name} hash mismatch. Expected {expected}, got {actual}")]
    ChecksumMismatch {
        source_name: String,
        expected: String,
        actual: String,
    },

    /// A shell command exited non-zero while failure-on-error was requested
    #[error("Command failed with error code {exit_code}: {command}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// No recipe matches the requested package in any repository/stream
    #[error("Package {0} not found in any repository")]
    PackageNotFound(String),

    /// Malformed package atom string
    #[error("Invalid package: {0}")]
    InvalidAtom(String),

    /// Another build attempt holds the workspace of this package
    #[error("Workspace {0} is locked by another build")]
    WorkspaceLocked(String),

    /// A required external tool is missing
    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or process I/O failure, with the path or action involved
    #[error("I/O error: {0}")]
    IoError(String),

    /// A fatal error raised during one phase of a build attempt
    #[error("{phase} failed for {atom}: {source}")]
    PhaseFailed {
        atom: String,
        phase: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

impl Error {
    /// Unwrap phase context down to the error that actually happened
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::PhaseFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Attach build-attempt context to an error
    pub(crate) fn in_phase(self, atom: impl ToString, phase: impl ToString) -> Self {
        match self {
            // Keep the innermost phase, it is the one that failed
            already @ Error::PhaseFailed { .. } => already,
            other => Error::PhaseFailed {
                atom: atom.to_string(),
                phase: phase.to_string(),
                source: Box::new(other),
            },
        }
    }
}
