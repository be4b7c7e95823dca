//! Path fingerprints used as cache keys.
//!
//! A fingerprint is the SHA-1 digest of a source path's string form. It
//! depends on nothing but that string: file contents and mtimes never
//! enter it, so it is stable across restarts and across edits.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha1::{Digest, Sha1};
use thiserror::Error;

/// Width of a fingerprint in bytes (160 bits).
pub const FINGERPRINT_LEN: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Invalid fingerprint '{input}': expected {expected} hex characters")]
    InvalidHex { input: String, expected: usize },
}

/// 160-bit digest identifying a source by its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Lowercase hex, 40 characters. Also used as the renderer job name.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(input: &str) -> Result<Self, FingerprintError> {
        let invalid = || FingerprintError::InvalidHex {
            input: input.to_string(),
            expected: FINGERPRINT_LEN * 2,
        };

        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Compute the fingerprint of a source path.
///
/// Non-UTF-8 path components are hashed through their lossy string form.
pub fn fingerprint(path: &Path) -> Fingerprint {
    fingerprint_str(&path.to_string_lossy())
}

/// Compute the fingerprint of a path string.
pub fn fingerprint_str(path: &str) -> Fingerprint {
    let digest = Sha1::digest(path.as_bytes());
    let mut bytes = [0u8; FINGERPRINT_LEN];
    bytes.copy_from_slice(&digest);
    Fingerprint(bytes)
}
