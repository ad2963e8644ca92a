//! Bearer token gate for the scrape endpoint
//!
//! The expected `Authorization` header is never held in memory. Only its
//! SHA-512 digest is kept, and presented headers are digested and compared
//! in constant time, so a mismatch takes the same time wherever it occurs.

use sha2::digest::Output;
use sha2::{Digest, Sha512};
use std::fmt;
use std::path::Path;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::{ExporterError, Result};

const BEARER_PREFIX: &[u8] = b"Bearer ";

/// Returned for every rejected request; carries no detail about why
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid authorization header")]
pub struct Unauthorized;

/// Validates `Authorization` header values against a pre-hashed bearer token
#[derive(Clone)]
pub struct BearerAuthorizer {
    authorized_header_digest: Output<Sha512>,
}

impl BearerAuthorizer {
    pub fn new(token: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(BEARER_PREFIX);
        hasher.update(token);
        Self {
            authorized_header_digest: hasher.finalize(),
        }
    }

    /// Check a raw header value; a missing header should be passed as empty
    pub fn authorize(&self, header_value: &[u8]) -> std::result::Result<(), Unauthorized> {
        let given = Sha512::digest(header_value);
        if bool::from(
            given
                .as_slice()
                .ct_eq(self.authorized_header_digest.as_slice()),
        ) {
            Ok(())
        } else {
            Err(Unauthorized)
        }
    }
}

impl fmt::Debug for BearerAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthorizer").finish_non_exhaustive()
    }
}

/// Read the scrape token file once at startup
///
/// A single trailing line ending is stripped so files written by `echo`
/// work. An empty token is rejected.
pub async fn load_scrape_token(path: &Path) -> Result<Vec<u8>> {
    let mut token = tokio::fs::read(path).await.map_err(|e| {
        ExporterError::ConfigError(format!(
            "Unable to read scrape token file {:?}: {}",
            path, e
        ))
    })?;

    if token.ends_with(b"\n") {
        token.pop();
        if token.ends_with(b"\r") {
            token.pop();
        }
    }

    if token.is_empty() {
        return Err(ExporterError::ConfigError(format!(
            "Scrape token file {:?} is empty",
            path
        )));
    }

    Ok(token)
}
