//! Startup backfill: enqueue every tracked source that has no artifact yet.

use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use super::classify::ExtensionFilter;
use super::error::WatchError;
use crate::cache::Namespace;
use crate::pipeline::{RenderJob, RenderPipeline, Submitted};

/// Counts from one warm-up walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmUpReport {
    /// Sources enqueued for rendering
    pub enqueued: usize,
    /// Sources whose artifact already existed
    pub already_cached: usize,
}

/// Walk `root` and enqueue a warm-up job for each tracked source without an
/// artifact.
///
/// Submission waits for queue space, so a large tree is throttled rather
/// than dropped. A walk error aborts this root only.
pub fn warm_up(
    root: &Path,
    namespace: Option<&Namespace>,
    filter: &ExtensionFilter,
    pipeline: &RenderPipeline,
) -> Result<WarmUpReport, WatchError> {
    let store = pipeline.store();
    let mut report = WarmUpReport::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| WatchError::WarmUp {
            root: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_file() || !filter.accepts(entry.path()) {
            continue;
        }

        let location = store.locate_source(entry.path(), namespace);
        if store.exists(&location) {
            report.already_cached += 1;
            continue;
        }

        let job = RenderJob::warm_up(entry.path(), namespace.cloned());
        match pipeline.submit_blocking(job) {
            Submitted::Queued => report.enqueued += 1,
            Submitted::Dropped => {}
            Submitted::Closed => return Err(WatchError::ChannelClosed),
        }
    }

    crate::log_event!(
        "warmup",
        "complete",
        "{}: {} enqueued, {} already cached",
        root.display(),
        report.enqueued,
        report.already_cached
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::render::RenderExecutor;
    use crate::render::testing::FakeRenderer;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn pipeline(cache: &Path, renderer: Arc<FakeRenderer>) -> RenderPipeline {
        let executor = RenderExecutor::new(CacheStore::new(cache), renderer);
        RenderPipeline::builder(executor)
            .workers(2)
            .queue_capacity(2)
            .start()
            .unwrap()
    }

    #[test]
    fn test_enqueues_every_uncached_source() {
        let docs = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        std::fs::create_dir_all(docs.path().join("ch1")).unwrap();
        for name in ["a.tex", "b.TEX", "ch1/c.tex", "ch1/d.tex", "notes.txt"] {
            std::fs::write(docs.path().join(name), "x").unwrap();
        }
        let renderer = Arc::new(FakeRenderer::default());
        let pipeline = pipeline(cache.path(), renderer.clone());

        // Queue capacity is 2; blocking submission still gets all four in
        let report = warm_up(docs.path(), None, &ExtensionFilter::default(), &pipeline).unwrap();
        assert_eq!(report.enqueued, 4);
        assert_eq!(report.already_cached, 0);

        assert!(pipeline.wait_idle(Duration::from_secs(5)));
        assert_eq!(renderer.calls(), 4);
    }

    #[test]
    fn test_second_pass_enqueues_nothing() {
        let docs = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        std::fs::write(docs.path().join("a.tex"), "x").unwrap();
        std::fs::write(docs.path().join("b.tex"), "x").unwrap();
        let renderer = Arc::new(FakeRenderer::default());
        let pipeline = pipeline(cache.path(), renderer.clone());
        let filter = ExtensionFilter::default();

        warm_up(docs.path(), None, &filter, &pipeline).unwrap();
        assert!(pipeline.wait_idle(Duration::from_secs(5)));

        let second = warm_up(docs.path(), None, &filter, &pipeline).unwrap();
        assert_eq!(second.enqueued, 0);
        assert_eq!(second.already_cached, 2);
        assert_eq!(renderer.calls(), 2);
    }

    #[test]
    fn test_missing_root_aborts() {
        let cache = TempDir::new().unwrap();
        let pipeline = pipeline(cache.path(), Arc::new(FakeRenderer::default()));

        let result = warm_up(
            &cache.path().join("does-not-exist"),
            None,
            &ExtensionFilter::default(),
            &pipeline,
        );
        assert!(matches!(result, Err(WatchError::WarmUp { .. })));
    }

    #[test]
    fn test_closed_pipeline_reports_channel_closed() {
        let docs = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        std::fs::write(docs.path().join("a.tex"), "x").unwrap();
        let pipeline = pipeline(cache.path(), Arc::new(FakeRenderer::default()));
        pipeline.shutdown();

        let result = warm_up(docs.path(), None, &ExtensionFilter::default(), &pipeline);
        assert!(matches!(result, Err(WatchError::ChannelClosed)));
    }
}
