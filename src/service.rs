//! Wiring of the long-lived parts: registry, pipeline and watcher.
//!
//! The CLI and the HTTP server both go through [`RenderService`], so adding
//! a data source behaves the same from either surface.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::cache::{CacheStore, Namespace};
use crate::config::Settings;
use crate::datasource::{
    DataSource, DataSourceError, DataSourceKind, DataSourceRecord, DataSourceResult,
    DataSourceStore,
};
use crate::pipeline::RenderPipeline;
use crate::render::{CommandRenderer, RenderExecutor, Renderer};
use crate::watcher::{DirectoryWatcher, ExtensionFilter, WarmUpReport, WatcherOptions, warm_up};

pub struct RenderService {
    settings: Arc<Settings>,
    sources: DataSourceStore,
    pipeline: Arc<RenderPipeline>,
    watcher: Option<DirectoryWatcher>,
}

impl RenderService {
    /// Start the pipeline with the configured renderer command. With
    /// `watch`, a directory watcher is started too (but no roots yet; see
    /// [`watch_registered`](Self::watch_registered)).
    pub fn start(settings: Settings, watch: bool) -> anyhow::Result<Self> {
        let renderer = Arc::new(CommandRenderer::from_config(&settings.render));
        Self::with_renderer(settings, renderer, watch)
    }

    pub fn with_renderer(
        settings: Settings,
        renderer: Arc<dyn Renderer>,
        watch: bool,
    ) -> anyhow::Result<Self> {
        let store = CacheStore::new(settings.cache_dir());
        store
            .ensure_dir(None)
            .context("Failed to prepare cache directory")?;

        let executor = RenderExecutor::new(store, renderer);
        let pipeline = RenderPipeline::builder(executor)
            .config(&settings.pipeline)
            .start()
            .context("Failed to start render workers")?;
        let pipeline = Arc::new(pipeline);

        let watcher = if watch {
            let options = WatcherOptions::from_settings(&settings);
            Some(
                DirectoryWatcher::start(Arc::clone(&pipeline), options)
                    .context("Failed to start directory watcher")?,
            )
        } else {
            None
        };

        let sources = DataSourceStore::new(settings.data_store_path());

        Ok(Self {
            settings: Arc::new(settings),
            sources,
            pipeline,
            watcher,
        })
    }

    /// Connect and watch every registered source. A source that fails is
    /// logged and skipped. Returns how many are being watched.
    pub fn watch_registered(&self) -> DataSourceResult<usize> {
        let Some(watcher) = &self.watcher else {
            return Ok(0);
        };

        let filter = self.filter();
        let mut watched = 0;
        for (name, record) in self.sources.get()? {
            let source = record.open(&filter);
            if let Err(e) = source.connect() {
                tracing::warn!("[sources] skipping '{name}': {e}");
                continue;
            }
            match watcher.add_root(source.root(), source.id()) {
                Ok(_) => watched += 1,
                Err(e) => tracing::warn!("[sources] cannot watch '{name}': {e}"),
            }
        }
        Ok(watched)
    }

    /// Validate, persist, connect and start watching a new source.
    pub fn add_source(
        &self,
        name: &str,
        kind: &str,
        path: &Path,
    ) -> DataSourceResult<DataSourceRecord> {
        if self.sources.get()?.contains_key(name) {
            return Err(DataSourceError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let kind: DataSourceKind = kind.parse()?;

        let source = kind.create(rand::random::<u32>(), path, &self.filter())?;
        let record = DataSourceRecord {
            kind,
            id: source.id(),
            path: source.root().to_path_buf(),
        };
        self.sources.insert(name, record.clone())?;
        source.connect()?;

        if let Some(watcher) = &self.watcher {
            if let Err(e) = watcher.add_root(source.root(), source.id()) {
                tracing::error!("[sources] '{name}' registered but not watched: {e}");
            }
        }

        crate::log_event!(
            "sources",
            "added",
            "'{name}' ({kind}, id {}) at {}",
            record.id,
            record.path.display()
        );
        Ok(record)
    }

    /// Look up a registered source by name.
    pub fn open_source(&self, name: &str) -> DataSourceResult<(DataSourceRecord, Box<dyn DataSource>)> {
        let record = self.sources.find(name)?;
        let source = record.open(&self.filter());
        Ok((record, source))
    }

    /// Which files count as documents, from `watch.extensions`. Listings use
    /// the same filter the watcher and warm-up render with.
    pub fn filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.settings.watch.extensions)
    }

    /// Cache namespace used for a source's artifacts.
    pub fn namespace_for(&self, record: &DataSourceRecord) -> Option<Namespace> {
        self.settings
            .cache
            .namespaced
            .then(|| Namespace::from(record.id))
    }

    /// One-shot warm-up of every source (or one named source). Waits until
    /// every enqueued render has finished or `timeout` elapses.
    pub fn warm_up(
        &self,
        only: Option<&str>,
        timeout: Duration,
    ) -> DataSourceResult<Vec<(String, WarmUpReport)>> {
        let filter = self.filter();
        let mut records = self.sources.get()?;
        if let Some(name) = only {
            let record = records.remove(name).ok_or_else(|| DataSourceError::Unknown {
                name: name.to_string(),
            })?;
            records = [(name.to_string(), record)].into();
        }

        let mut reports = Vec::with_capacity(records.len());
        for (name, record) in records {
            let namespace = self.namespace_for(&record);
            match warm_up(&record.path, namespace.as_ref(), &filter, &self.pipeline) {
                Ok(report) => reports.push((name, report)),
                Err(e) => tracing::error!("[warmup] '{name}': {e}"),
            }
        }

        if !self.pipeline.wait_idle(timeout) {
            tracing::warn!(
                "[warmup] {} renders still pending after {}s",
                self.pipeline.queue().pending(),
                timeout.as_secs()
            );
        }
        Ok(reports)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sources(&self) -> &DataSourceStore {
        &self.sources
    }

    pub fn pipeline(&self) -> &Arc<RenderPipeline> {
        &self.pipeline
    }

    pub fn store(&self) -> &CacheStore {
        self.pipeline.store()
    }

    pub fn watcher(&self) -> Option<&DirectoryWatcher> {
        self.watcher.as_ref()
    }

    /// Stop the watcher, then drain and stop the workers.
    pub fn shutdown(&self) {
        if let Some(watcher) = &self.watcher {
            watcher.join();
        }
        self.pipeline.shutdown();
        crate::log_event!("service", "stopped");
    }
}
