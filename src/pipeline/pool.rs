//! Fixed-size pool of render workers draining the shared job queue.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::debounce::Debouncer;
use super::job::RenderJob;
use super::stats::PipelineStats;
use crate::cache::Eviction;
use crate::render::{RenderExecutor, RenderOutcome};

/// Prune the debounce map after this many processed jobs.
const PRUNE_EVERY: usize = 256;

/// What the owning worker does once its current render finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Followup {
    Done,
    /// Another admitted job arrived mid-render; the result may be stale.
    Rerender,
    /// The source was deleted mid-render; its output must not outlive it.
    Evict,
}

/// Sources currently being rendered, with the follow-up each owes.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    renders: Mutex<HashMap<PathBuf, Followup>>,
}

impl InFlight {
    /// Claim `path` for rendering. Returns false (and asks the owner for a
    /// re-render) when another worker already owns it. A job for a source
    /// marked evicted means the file is back, so it re-renders too.
    pub(crate) fn claim(&self, path: &Path) -> bool {
        let mut renders = self.renders.lock();
        match renders.get_mut(path) {
            Some(followup) => {
                *followup = Followup::Rerender;
                false
            }
            None => {
                renders.insert(path.to_path_buf(), Followup::Done);
                true
            }
        }
    }

    /// Tell the owner of `path` to drop its artifact when done. Returns
    /// false when no render is running for it.
    pub(crate) fn mark_evicted(&self, path: &Path) -> bool {
        match self.renders.lock().get_mut(path) {
            Some(followup) => {
                *followup = Followup::Evict;
                true
            }
            None => false,
        }
    }

    /// Release `path` after a render. On [`Followup::Rerender`] the claim is
    /// kept for one more render; otherwise it is dropped.
    pub(crate) fn release(&self, path: &Path) -> Followup {
        let mut renders = self.renders.lock();
        let followup = renders.get(path).copied().unwrap_or(Followup::Done);
        match followup {
            Followup::Rerender => {
                renders.insert(path.to_path_buf(), Followup::Done);
            }
            Followup::Done | Followup::Evict => {
                renders.remove(path);
            }
        }
        followup
    }

    pub(crate) fn len(&self) -> usize {
        self.renders.lock().len()
    }
}

/// State shared by every worker thread.
struct Shared {
    receiver: Receiver<RenderJob>,
    debouncer: Arc<Debouncer>,
    executor: RenderExecutor,
    in_flight: Arc<InFlight>,
    stats: Arc<PipelineStats>,
    pending: Arc<AtomicUsize>,
    processed: AtomicUsize,
}

/// Bounded set of worker threads.
///
/// Each worker pulls the next job, applies the debounce check, and runs the
/// executor synchronously. A failed render is logged and the worker moves on.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        workers: usize,
        receiver: Receiver<RenderJob>,
        debouncer: Arc<Debouncer>,
        executor: RenderExecutor,
        in_flight: Arc<InFlight>,
        stats: Arc<PipelineStats>,
        pending: Arc<AtomicUsize>,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            receiver,
            debouncer,
            executor,
            in_flight,
            stats,
            pending,
            processed: AtomicUsize::new(0),
        });

        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("texbook-render-{id}"))
                .spawn(move || worker_loop(id, &shared))?;
            handles.push(handle);
        }

        crate::log_event!("pool", "started", "{workers} workers");
        Ok(Self { handles, shared })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers exit once the queue is closed
    /// and drained.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!("[pool] worker panicked");
            }
        }
        crate::log_event!("pool", "stopped");
    }
}

fn worker_loop(id: usize, shared: &Shared) {
    crate::debug_event!("pool", "worker up", "#{id}");

    // recv() fails only once every sender is gone and the queue is empty.
    while let Ok(job) = shared.receiver.recv() {
        process(shared, &job);
        shared.pending.fetch_sub(1, Ordering::SeqCst);

        let processed = shared.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % PRUNE_EVERY == 0 {
            shared.debouncer.prune(Instant::now());
        }
    }

    crate::debug_event!("pool", "worker down", "#{id}");
}

fn process(shared: &Shared, job: &RenderJob) {
    // The debounce lock is held only for this check, never across a render.
    if !shared.debouncer.admit(&job.path) {
        shared.stats.record_debounced();
        crate::debug_event!("pool", "debounced", "{}", job.path.display());
        return;
    }

    if !shared.in_flight.claim(&job.path) {
        shared.stats.record_coalesced();
        crate::debug_event!("pool", "coalesced", "{}", job.path.display());
        return;
    }

    let mut force = job.forces_render();
    loop {
        render_one(shared, job, force);
        match shared.in_flight.release(&job.path) {
            Followup::Done => break,
            // Another event arrived mid-render; the artifact may predate it.
            Followup::Rerender => force = true,
            Followup::Evict => {
                discard(shared, job);
                break;
            }
        }
    }
}

/// Remove what a render wrote for a source deleted while it ran.
fn discard(shared: &Shared, job: &RenderJob) {
    let store = shared.executor.store();
    let location = store.locate_source(&job.path, job.namespace.as_ref());
    match store.evict(&location) {
        Ok(Eviction::Removed) => crate::log_event!(
            "pool",
            "discarded",
            "{} was deleted mid-render",
            job.path.display()
        ),
        Ok(Eviction::NotFound) => {}
        Err(e) => tracing::error!("[pool] {e}"),
    }
}

fn render_one(shared: &Shared, job: &RenderJob, force: bool) {
    crate::log_event!("pool", "rendering", "{}", job.path.display());

    let namespace = job.namespace.as_ref();
    let result = if force {
        shared.executor.rerender(&job.path, namespace)
    } else {
        shared.executor.render(&job.path, namespace)
    };

    match result {
        Ok(rendered) => match rendered.outcome {
            RenderOutcome::Built => {
                shared.stats.record_rendered();
                crate::log_event!(
                    "pool",
                    "cached",
                    "{} -> {}",
                    job.path.display(),
                    rendered.location.display()
                );
            }
            RenderOutcome::CacheHit => {
                shared.stats.record_cache_hit();
                crate::debug_event!("pool", "already cached", "{}", job.path.display());
            }
        },
        Err(e) => {
            shared.stats.record_failed();
            tracing::error!("[pool] failed to render {}: {e}", job.path.display());
        }
    }
}
