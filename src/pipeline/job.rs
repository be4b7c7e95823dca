use std::path::{Path, PathBuf};

use crate::cache::Namespace;

/// Why a job was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The source was created or written; any existing artifact is stale.
    Changed,
    /// Startup backfill; an existing artifact is good enough.
    WarmUp,
}

/// Request to render one source into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub path: PathBuf,
    pub namespace: Option<Namespace>,
    pub trigger: Trigger,
}

impl RenderJob {
    pub fn changed(path: impl Into<PathBuf>, namespace: Option<Namespace>) -> Self {
        Self {
            path: path.into(),
            namespace,
            trigger: Trigger::Changed,
        }
    }

    pub fn warm_up(path: impl Into<PathBuf>, namespace: Option<Namespace>) -> Self {
        Self {
            path: path.into(),
            namespace,
            trigger: Trigger::WarmUp,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the render must ignore an existing artifact.
    pub fn forces_render(&self) -> bool {
        self.trigger == Trigger::Changed
    }
}
