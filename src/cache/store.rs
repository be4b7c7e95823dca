//! On-disk artifact cache keyed by fingerprint.
//!
//! Layout: `<root>[/<namespace>]/<hex-fingerprint>.pdf`. There is no index
//! file; the presence of the artifact is the cache entry.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{CacheError, CacheResult};
use super::fingerprint::{Fingerprint, fingerprint};

/// Extension of rendered artifacts.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Cache partition, one per data source when namespacing is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Parse a namespace segment. Only ASCII alphanumerics, `-` and `_` are
    /// accepted so a namespace can never escape the cache root.
    pub fn parse(segment: &str) -> Option<Self> {
        let valid = !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for Namespace {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of an eviction. A missing artifact is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    Removed,
    NotFound,
}

/// Maps fingerprints to artifact locations under a cache root.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding artifacts for a namespace.
    pub fn dir(&self, namespace: Option<&Namespace>) -> PathBuf {
        match namespace {
            Some(ns) => self.root.join(ns.as_str()),
            None => self.root.clone(),
        }
    }

    /// Artifact path for a fingerprint. Pure, no I/O.
    pub fn locate(&self, fingerprint: &Fingerprint, namespace: Option<&Namespace>) -> PathBuf {
        self.dir(namespace)
            .join(format!("{}.{ARTIFACT_EXTENSION}", fingerprint.to_hex()))
    }

    /// Artifact path for a source path.
    pub fn locate_source(&self, source: &Path, namespace: Option<&Namespace>) -> PathBuf {
        self.locate(&fingerprint(source), namespace)
    }

    pub fn exists(&self, location: &Path) -> bool {
        location.is_file()
    }

    /// Create the output directory for a namespace if it is missing.
    pub fn ensure_dir(&self, namespace: Option<&Namespace>) -> CacheResult<PathBuf> {
        let dir = self.dir(namespace);
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Delete an artifact. Idempotent.
    pub fn evict(&self, location: &Path) -> CacheResult<Eviction> {
        match std::fs::remove_file(location) {
            Ok(()) => Ok(Eviction::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Eviction::NotFound),
            Err(source) => Err(CacheError::Evict {
                path: location.to_path_buf(),
                source,
            }),
        }
    }

    /// URL path the HTTP layer serves an artifact under.
    pub fn public_path(fingerprint: &Fingerprint, namespace: Option<&Namespace>) -> String {
        match namespace {
            Some(ns) => format!("/cache/{ns}/{}.{ARTIFACT_EXTENSION}", fingerprint.to_hex()),
            None => format!("/cache/{}.{ARTIFACT_EXTENSION}", fingerprint.to_hex()),
        }
    }
}
