//! Render executor: turns one source document into a cached artifact.
//!
//! The executor owns the cache decision (hit or build) and delegates the
//! actual work to a [`Renderer`], normally an external command.

mod command;
mod error;

pub use command::CommandRenderer;
pub use error::{RenderError, RenderResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheStore, Fingerprint, Namespace, fingerprint};

/// Inputs for one renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Absolute path of the source document
    pub source: PathBuf,
    /// Directory the artifact must be written to
    pub output_dir: PathBuf,
    /// Artifact base name; the renderer writes `<job_name>.pdf`
    pub job_name: String,
}

/// Produces `<output_dir>/<job_name>.pdf` from a source, or fails.
pub trait Renderer: Send + Sync {
    fn render(&self, request: &RenderRequest) -> RenderResult<()>;
}

/// Whether a render was performed or short-circuited by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Built,
    CacheHit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub fingerprint: Fingerprint,
    pub location: PathBuf,
    pub outcome: RenderOutcome,
}

/// Renders sources into the cache store.
#[derive(Clone)]
pub struct RenderExecutor {
    store: CacheStore,
    renderer: Arc<dyn Renderer>,
}

impl RenderExecutor {
    pub fn new(store: CacheStore, renderer: Arc<dyn Renderer>) -> Self {
        Self { store, renderer }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Render unless the artifact already exists.
    pub fn render(&self, source: &Path, namespace: Option<&Namespace>) -> RenderResult<Rendered> {
        self.run(source, namespace, false)
    }

    /// Render even if an artifact exists. Used after a source was written,
    /// since the fingerprint does not change with content.
    pub fn rerender(&self, source: &Path, namespace: Option<&Namespace>) -> RenderResult<Rendered> {
        self.run(source, namespace, true)
    }

    fn run(
        &self,
        source: &Path,
        namespace: Option<&Namespace>,
        force: bool,
    ) -> RenderResult<Rendered> {
        let fingerprint = fingerprint(source);
        let location = self.store.locate(&fingerprint, namespace);

        if !force && self.store.exists(&location) {
            crate::debug_event!("render", "cache hit", "{}", source.display());
            return Ok(Rendered {
                fingerprint,
                location,
                outcome: RenderOutcome::CacheHit,
            });
        }

        let output_dir = self.store.ensure_dir(namespace)?;
        // The renderer runs from the source's directory, so the output
        // directory must not be relative.
        let output_dir = std::path::absolute(&output_dir)?;

        let request = RenderRequest {
            source: source.to_path_buf(),
            output_dir,
            job_name: fingerprint.to_hex(),
        };
        self.renderer.render(&request)?;

        if !self.store.exists(&location) {
            return Err(RenderError::MissingArtifact { path: location });
        }

        Ok(Rendered {
            fingerprint,
            location,
            outcome: RenderOutcome::Built,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test renderers shared by the pipeline and watcher tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writes a stub PDF and counts invocations.
    #[derive(Default)]
    pub struct FakeRenderer {
        pub calls: AtomicUsize,
        pub delay: Option<Duration>,
        pub fail: bool,
    }

    impl FakeRenderer {
        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Renderer for FakeRenderer {
        fn render(&self, request: &RenderRequest) -> RenderResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.fail {
                return Err(RenderError::Failed {
                    path: request.source.clone(),
                    status: Some(1),
                    output: "! Undefined control sequence.".to_string(),
                });
            }
            let artifact = request.output_dir.join(format!("{}.pdf", request.job_name));
            std::fs::write(artifact, b"%PDF-1.5 fake")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRenderer;
    use super::*;
    use tempfile::TempDir;

    fn executor(dir: &TempDir, renderer: Arc<FakeRenderer>) -> RenderExecutor {
        RenderExecutor::new(CacheStore::new(dir.path().join("cache")), renderer)
    }

    #[test]
    fn test_render_twice_builds_once() {
        let dir = TempDir::new().unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let executor = executor(&dir, renderer.clone());
        let source = dir.path().join("a.tex");

        let first = executor.render(&source, None).unwrap();
        assert_eq!(first.outcome, RenderOutcome::Built);
        assert!(first.location.is_file());
        assert_eq!(first.fingerprint, fingerprint(&source));

        let second = executor.render(&source, None).unwrap();
        assert_eq!(second.outcome, RenderOutcome::CacheHit);
        assert_eq!(second.location, first.location);
        assert_eq!(renderer.calls(), 1);
    }

    #[test]
    fn test_rerender_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let executor = executor(&dir, renderer.clone());
        let source = dir.path().join("a.tex");

        executor.render(&source, None).unwrap();
        let again = executor.rerender(&source, None).unwrap();

        assert_eq!(again.outcome, RenderOutcome::Built);
        assert_eq!(renderer.calls(), 2);
    }

    #[test]
    fn test_namespace_creates_subdirectory() {
        let dir = TempDir::new().unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let executor = executor(&dir, renderer);
        let ns = Namespace::from(99);

        let rendered = executor.render(&dir.path().join("a.tex"), Some(&ns)).unwrap();
        assert_eq!(
            rendered.location.parent().unwrap(),
            dir.path().join("cache").join("99")
        );
    }

    #[test]
    fn test_failure_propagates_and_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let renderer = Arc::new(FakeRenderer::failing());
        let executor = executor(&dir, renderer);
        let source = dir.path().join("broken.tex");

        let err = executor.render(&source, None).unwrap_err();
        assert!(err.output().unwrap().contains("Undefined control sequence"));
        assert!(!executor.store().exists(&executor.store().locate_source(&source, None)));
    }

    #[test]
    fn test_success_without_artifact_is_error() {
        struct Silent;
        impl Renderer for Silent {
            fn render(&self, _request: &RenderRequest) -> RenderResult<()> {
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let executor = RenderExecutor::new(CacheStore::new(dir.path().join("cache")), Arc::new(Silent));
        let err = executor.render(&dir.path().join("a.tex"), None).unwrap_err();
        assert!(matches!(err, RenderError::MissingArtifact { .. }));
    }
}
