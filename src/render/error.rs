use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheError;

/// Errors from a single render attempt.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer failed for {path} (exit code {status:?})\n{output}")]
    Failed {
        path: PathBuf,
        status: Option<i32>,
        output: String,
    },

    #[error("Renderer timed out after {timeout:?} for {path}\n{output}")]
    TimedOut {
        path: PathBuf,
        timeout: Duration,
        output: String,
    },

    #[error("Renderer reported success but produced no artifact at {path}")]
    MissingArtifact { path: PathBuf },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Combined renderer output, when the renderer got far enough to produce any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RenderError::Failed { output, .. } | RenderError::TimedOut { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
