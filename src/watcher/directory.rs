//! Directory watcher feeding the render pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};

use super::classify::{ExtensionFilter, WatchAction, classify};
use super::error::WatchError;
use super::roots::{RootRegistry, RootState, WatchRoot, watch_dirs};
use super::warm_up::warm_up;
use crate::cache::{CacheResult, Eviction, Namespace};
use crate::config::Settings;
use crate::pipeline::{RenderJob, RenderPipeline, Submitted};

/// Raw events buffered between notify's thread and the event loop.
const EVENT_BUFFER: usize = 1024;

/// Watcher behaviour taken from settings.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub filter: ExtensionFilter,
    /// Route each root's artifacts into a namespace named after its id
    pub namespaced: bool,
    /// Backfill missing artifacts when a root is added
    pub warm_up: bool,
}

impl WatcherOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            filter: ExtensionFilter::new(&settings.watch.extensions),
            namespaced: settings.cache.namespaced,
            warm_up: settings.watch.warm_up,
        }
    }
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            filter: ExtensionFilter::default(),
            namespaced: false,
            warm_up: true,
        }
    }
}

struct Inner {
    /// `None` once closed. Dropping it ends the event loop.
    notify: Mutex<Option<RecommendedWatcher>>,
    roots: RwLock<RootRegistry>,
    pipeline: Arc<RenderPipeline>,
    options: WatcherOptions,
}

/// Watches data-source roots and turns file events into render jobs and
/// cache evictions.
///
/// One notify watcher serves every root. Each directory present at
/// registration gets a non-recursive watch; events run on a dedicated
/// thread so a slow submission never blocks notify itself.
pub struct DirectoryWatcher {
    inner: Arc<Inner>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
    warm_ups: Mutex<Vec<JoinHandle<()>>>,
}

impl DirectoryWatcher {
    /// Create the notify watcher and start the event loop. No roots are
    /// watched until [`add_root`](Self::add_root).
    pub fn start(
        pipeline: Arc<RenderPipeline>,
        options: WatcherOptions,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_BUFFER);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let inner = Arc::new(Inner {
            notify: Mutex::new(Some(watcher)),
            roots: RwLock::new(RootRegistry::new()),
            pipeline,
            options,
        });

        let handle = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("texbook-watcher".to_string())
                .spawn(move || event_loop(&inner, &rx))
                .map_err(|e| WatchError::InitFailed {
                    reason: e.to_string(),
                })?
        };

        crate::log_event!(
            "watcher",
            "started",
            "extensions: {:?}",
            inner.options.filter.extensions()
        );

        Ok(Self {
            inner,
            event_loop: Mutex::new(Some(handle)),
            warm_ups: Mutex::new(Vec::new()),
        })
    }

    /// Register a data-source root and watch every directory below it.
    ///
    /// When warm-up is enabled it runs on its own thread, so this returns
    /// as soon as the watches are installed.
    pub fn add_root(&self, path: &Path, id: u32) -> Result<WatchRoot, WatchError> {
        if self.is_closed() {
            return Err(WatchError::Closed);
        }
        let root = path
            .canonicalize()
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !root.is_dir() {
            return Err(WatchError::PathWatchFailed {
                path: root,
                reason: "not a directory".to_string(),
            });
        }

        let namespace = self.inner.options.namespaced.then(|| Namespace::from(id));
        self.inner.roots.write().insert(WatchRoot {
            id,
            path: root.clone(),
            namespace: namespace.clone(),
            state: RootState::Registered,
            watched_dirs: 0,
        });

        let watched = match self.install_watches(&root) {
            Ok(watched) => watched,
            Err(e) => {
                if let Some(entry) = self.inner.roots.write().get_mut(&root) {
                    entry.state = RootState::Closed;
                }
                return Err(e);
            }
        };

        let registered = {
            let mut roots = self.inner.roots.write();
            let entry = roots
                .get_mut(&root)
                .ok_or_else(|| WatchError::PathWatchFailed {
                    path: root.clone(),
                    reason: "root vanished during registration".to_string(),
                })?;
            entry.state = RootState::Active;
            entry.watched_dirs = watched;
            entry.clone()
        };

        crate::log_event!(
            "watcher",
            "watching",
            "{} ({watched} directories, source {id})",
            root.display()
        );

        if self.inner.options.warm_up {
            self.spawn_warm_up(root, namespace);
        }
        Ok(registered)
    }

    fn install_watches(&self, root: &Path) -> Result<usize, WatchError> {
        let mut guard = self.inner.notify.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        // The root itself must be watchable; a failing subdirectory is
        // logged and skipped.
        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut watched = 1;
        for dir in watch_dirs(root).into_iter().filter(|dir| dir != root) {
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    watched += 1;
                    crate::debug_event!("watcher", "watching", "{}", dir.display());
                }
                Err(e) => {
                    tracing::warn!("[watcher] failed to watch {}: {e}", dir.display());
                }
            }
        }
        Ok(watched)
    }

    fn spawn_warm_up(&self, root: PathBuf, namespace: Option<Namespace>) {
        let pipeline = Arc::clone(&self.inner.pipeline);
        let filter = self.inner.options.filter.clone();

        let spawned = thread::Builder::new()
            .name("texbook-warmup".to_string())
            .spawn(move || {
                if let Err(e) = warm_up(&root, namespace.as_ref(), &filter, &pipeline) {
                    tracing::error!("[warmup] {e}");
                }
            });

        match spawned {
            Ok(handle) => self.warm_ups.lock().push(handle),
            Err(e) => tracing::error!("[warmup] failed to start: {e}"),
        }
    }

    /// Evict the artifact for a source that no longer exists.
    pub fn evict(&self, source: &Path) -> CacheResult<Eviction> {
        self.inner.evict(source)
    }

    /// Snapshot of the registered roots.
    pub fn roots(&self) -> Vec<WatchRoot> {
        self.inner.roots.read().roots().to_vec()
    }

    pub fn namespace_for(&self, path: &Path) -> Option<Namespace> {
        self.inner.roots.read().namespace_for(path)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.notify.lock().is_none()
    }

    /// Stop receiving events. The event loop exits once the buffered events
    /// are handled.
    pub fn close(&self) {
        if self.inner.notify.lock().take().is_some() {
            self.inner.roots.write().set_all(RootState::Closed);
            crate::log_event!("watcher", "closed");
        }
    }

    /// Close, then wait for the event loop and any warm-up walks to finish.
    pub fn join(&self) {
        self.close();
        if let Some(handle) = self.event_loop.lock().take() {
            if handle.join().is_err() {
                tracing::error!("[watcher] event loop panicked");
            }
        }
        let warm_ups: Vec<_> = self.warm_ups.lock().drain(..).collect();
        for handle in warm_ups {
            if handle.join().is_err() {
                tracing::error!("[warmup] walk panicked");
            }
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.event_loop.lock().take() {
            let _ = handle.join();
        }
    }
}

fn event_loop(inner: &Inner, rx: &Receiver<notify::Result<Event>>) {
    // Ends when the notify watcher, and with it the sender, is dropped.
    for res in rx.iter() {
        match res {
            Ok(event) => inner.handle(&event),
            // Transport errors do not stop the loop.
            Err(e) => tracing::error!("[watcher] {}", WatchError::event(e)),
        }
    }
    crate::debug_event!("watcher", "event loop stopped");
}

impl Inner {
    fn handle(&self, event: &Event) {
        for action in classify(event, &self.options.filter) {
            match action {
                WatchAction::Render { path } => {
                    let namespace = self.roots.read().namespace_for(&path);
                    match self.pipeline.submit(RenderJob::changed(&path, namespace)) {
                        Submitted::Queued | Submitted::Dropped => {}
                        Submitted::Closed => {
                            crate::debug_event!(
                                "watcher",
                                "pipeline closed, ignoring",
                                "{}",
                                path.display()
                            );
                        }
                    }
                }
                WatchAction::Evict { path } => {
                    if let Err(e) = self.evict(&path) {
                        tracing::error!("[watcher] {e}");
                    }
                }
            }
        }
    }

    fn evict(&self, source: &Path) -> CacheResult<Eviction> {
        let namespace = self.roots.read().namespace_for(source);
        let eviction = self.pipeline.evict(source, namespace.as_ref())?;
        match eviction {
            Eviction::Removed => crate::log_event!("watcher", "evicted", "{}", source.display()),
            Eviction::NotFound => {
                crate::debug_event!("watcher", "nothing to evict", "{}", source.display())
            }
        }
        Ok(eviction)
    }
}
