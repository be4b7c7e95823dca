//! Content cache for rendered artifacts.
//!
//! Artifacts are addressed by the fingerprint of their source path, not by
//! the source's bytes.

mod error;
pub mod fingerprint;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use fingerprint::{Fingerprint, FingerprintError, fingerprint};
pub use store::{ARTIFACT_EXTENSION, CacheStore, Eviction, Namespace};
