//! Directory watcher for data-source roots.
//!
//! # Architecture
//!
//! ```text
//! DirectoryWatcher
//!   - single notify::RecommendedWatcher, one non-recursive watch per directory
//!   - RootRegistry (root -> source id, namespace, state)
//!   - event loop thread
//!         |
//!    classify()
//!      |                 |
//!   Render            Evict
//!   RenderPipeline    CacheStore::evict
//! ```
//!
//! Warm-up walks a root once at registration and enqueues every source
//! whose artifact is missing.

mod classify;
mod directory;
mod error;
mod roots;
mod warm_up;

pub use classify::{ExtensionFilter, WatchAction, classify};
pub use directory::{DirectoryWatcher, WatcherOptions};
pub use error::WatchError;
pub use roots::{RootRegistry, RootState, WatchRoot, watch_dirs};
pub use warm_up::{WarmUpReport, warm_up};
