// src/repository/resolution.rs

//! Package atom parsing
//!
//! Users name packages as one of:
//!
//! ```text
//! binutils              latest version
//! binutils/latest       latest version
//! binutils/2.44         version 2.44, release 0
//! binutils/2.44-1       version 2.44, release 1
//! ```

use crate::error::{Error, Result};
use crate::recipe::format::Atom;

/// Version placeholder resolved through the repository's `latest` file
pub const LATEST_VERSION: &str = "latest";

/// Release assumed when an atom does not give one
pub const DEFAULT_RELEASE: &str = "0";

/// A package request before `latest` has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomRequest {
    Latest { name: String },
    Exact(Atom),
}

/// Parse a user-supplied package string
pub fn parse_atom_request(input: &str) -> Result<AtomRequest> {
    let invalid = || Error::InvalidAtom(input.to_string());

    let (name, version) = match input.split_once('/') {
        None => (input, LATEST_VERSION),
        Some((name, version)) => {
            if version.contains('/') {
                return Err(invalid());
            }
            (name, version)
        }
    };

    if name.is_empty() || version.is_empty() {
        return Err(invalid());
    }

    if version == LATEST_VERSION {
        return Ok(AtomRequest::Latest {
            name: name.to_string(),
        });
    }

    let (version, release) = split_version_release(version).map_err(|_| invalid())?;
    Ok(AtomRequest::Exact(Atom::new(name, version, release)))
}

/// Split `version[-release]`, defaulting the release to `0`
pub fn split_version_release(version: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = version.split('-').collect();

    match parts.as_slice() {
        [version] if !version.is_empty() => Ok((version.to_string(), DEFAULT_RELEASE.to_string())),
        [version, release] if !version.is_empty() && !release.is_empty() => {
            Ok((version.to_string(), release.to_string()))
        }
        _ => Err(Error::InvalidAtom(format!("Invalid version: {}", version))),
    }
}
