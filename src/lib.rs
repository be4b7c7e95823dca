//! Watches directories of LaTeX sources and keeps a cache of rendered PDFs
//! in sync with them.
//!
//! Sources are keyed by a fingerprint of their path. A change enqueues a
//! render job; a bounded worker pool debounces and renders; a deletion
//! evicts the artifact.

pub mod cache;
pub mod cli;
pub mod config;
pub mod datasource;
pub mod logging;
pub mod pipeline;
pub mod render;
#[cfg(feature = "http-server")]
pub mod server;
pub mod service;
pub mod watcher;

pub use cache::{CacheStore, Fingerprint, Namespace, fingerprint};
pub use config::Settings;
pub use datasource::{DataSource, DataSourceStore, FileNode, LocalDataSource};
pub use pipeline::{RenderJob, RenderPipeline};
pub use render::{RenderExecutor, Renderer};
pub use service::RenderService;
pub use watcher::DirectoryWatcher;
