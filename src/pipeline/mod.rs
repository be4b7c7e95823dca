//! Render pipeline: debounced job queue feeding a bounded worker pool.
//!
//! # Architecture
//!
//! ```text
//! watcher / warm-up
//!        |
//!    submit()            bounded queue, drop or block when full
//!        v
//!   [ JobQueue ] ----> worker 1 ..N
//!                        | debounce check (one mutex, lookup + update)
//!                        | in-flight claim (one render per source)
//!                        v
//!                   RenderExecutor -> CacheStore
//! ```
//!
//! One `RenderPipeline` is built at startup and shared by `Arc` with the
//! watcher and the HTTP layer. Nothing here is global, so tests can run
//! several pipelines side by side.

mod debounce;
mod job;
mod pool;
mod queue;
mod stats;

pub use debounce::{DEFAULT_WINDOW, Debouncer};
pub use job::{RenderJob, Trigger};
pub use pool::WorkerPool;

use pool::InFlight;
pub use queue::{Backpressure, JobQueue, Submitted};
pub use stats::{PipelineStats, StatsSnapshot};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::{CacheResult, CacheStore, Eviction, Namespace};
use crate::config::PipelineConfig;
use crate::render::RenderExecutor;

const IDLE_POLL: Duration = Duration::from_millis(10);

/// The running pipeline.
pub struct RenderPipeline {
    queue: JobQueue,
    debouncer: Arc<Debouncer>,
    executor: RenderExecutor,
    in_flight: Arc<InFlight>,
    stats: Arc<PipelineStats>,
    pool: Mutex<Option<WorkerPool>>,
}

impl RenderPipeline {
    pub fn builder(executor: RenderExecutor) -> RenderPipelineBuilder {
        RenderPipelineBuilder::new(executor)
    }

    /// Submit a job. Never blocks under the drop policy.
    pub fn submit(&self, job: RenderJob) -> Submitted {
        let path = job.path.clone();
        let submitted = self.queue.submit(job);
        if submitted == Submitted::Queued {
            crate::debug_event!("queue", "queued", "{}", path.display());
        }
        submitted
    }

    /// Submit a job, waiting for a free slot if the queue is full.
    pub fn submit_blocking(&self, job: RenderJob) -> Submitted {
        self.queue.submit_with(job, Backpressure::Block)
    }

    pub fn executor(&self) -> &RenderExecutor {
        &self.executor
    }

    pub fn store(&self) -> &CacheStore {
        self.executor.store()
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Sources with a render in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Remove the artifact of a deleted source.
    ///
    /// A render still running for it removes its own output when it
    /// finishes, so the artifact cannot reappear after this returns.
    pub fn evict(&self, source: &Path, namespace: Option<&Namespace>) -> CacheResult<Eviction> {
        // A recreated file must not be debounced against its old self.
        self.debouncer.forget(source);
        if self.in_flight.mark_evicted(source) {
            crate::debug_event!("pipeline", "evicting after render", "{}", source.display());
        }
        let store = self.store();
        store.evict(&store.locate_source(source, namespace))
    }

    /// Block until every submitted job has been processed, or the timeout
    /// elapses. Returns whether the pipeline went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.queue.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(IDLE_POLL);
        }
        true
    }

    /// Close the queue, let the workers drain it, and join them.
    ///
    /// Renders already running are allowed to finish. Calling this twice
    /// is harmless.
    pub fn shutdown(&self) {
        self.queue.close();
        if let Some(pool) = self.pool.lock().take() {
            pool.join();
        }
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for [`RenderPipeline`].
pub struct RenderPipelineBuilder {
    executor: RenderExecutor,
    workers: usize,
    queue_capacity: usize,
    debounce: Duration,
    backpressure: Backpressure,
}

impl RenderPipelineBuilder {
    pub fn new(executor: RenderExecutor) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            executor,
            workers: defaults.workers,
            queue_capacity: defaults.queue_capacity,
            debounce: defaults.debounce_window(),
            backpressure: defaults.backpressure,
        }
    }

    /// Take every knob from the `[pipeline]` settings section.
    pub fn config(self, config: &PipelineConfig) -> Self {
        self.workers(config.workers)
            .queue_capacity(config.queue_capacity)
            .debounce(config.debounce_window())
            .backpressure(config.backpressure)
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn backpressure(mut self, policy: Backpressure) -> Self {
        self.backpressure = policy;
        self
    }

    /// Create the queue and start the workers.
    pub fn start(self) -> std::io::Result<RenderPipeline> {
        let stats = Arc::new(PipelineStats::default());
        let in_flight = Arc::new(InFlight::default());
        let debouncer = Arc::new(Debouncer::new(self.debounce));
        let (queue, receiver) =
            JobQueue::new(self.queue_capacity, self.backpressure, Arc::clone(&stats));

        let pool = WorkerPool::spawn(
            self.workers,
            receiver,
            Arc::clone(&debouncer),
            self.executor.clone(),
            Arc::clone(&in_flight),
            Arc::clone(&stats),
            queue.pending_counter(),
        )?;

        crate::log_event!(
            "pipeline",
            "started",
            "workers: {}, queue: {}, debounce: {}ms, backpressure: {:?}",
            pool.size(),
            queue.capacity(),
            self.debounce.as_millis(),
            self.backpressure
        );

        Ok(RenderPipeline {
            queue,
            debouncer,
            executor: self.executor,
            in_flight,
            stats,
            pool: Mutex::new(Some(pool)),
        })
    }
}
