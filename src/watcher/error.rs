//! Error types for the directory watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Warm-up of {root} aborted: {reason}")]
    WarmUp { root: PathBuf, reason: String },

    #[error("Watcher is closed")]
    Closed,

    #[error("Render queue closed unexpectedly")]
    ChannelClosed,
}

impl WatchError {
    /// Wrap an error delivered on the event stream, as opposed to one from
    /// setting the watcher up.
    pub fn event(e: notify::Error) -> Self {
        WatchError::EventError {
            details: e.to_string(),
        }
    }
}

/// Setup errors. Errors on the event stream go through [`WatchError::event`].
impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
