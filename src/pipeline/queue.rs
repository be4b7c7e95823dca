//! Bounded job queue with a configurable backpressure policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::job::RenderJob;
use super::stats::PipelineStats;

/// What `submit` does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backpressure {
    /// Reject the job and log it. Keeps the watcher loop from stalling.
    #[default]
    Drop,
    /// Wait for a free slot.
    Block,
}

/// Result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Queued,
    Dropped,
    /// The queue was shut down.
    Closed,
}

/// Producer side of the job queue. Shared by the watcher and warm-up.
#[derive(Debug)]
pub struct JobQueue {
    /// `None` once closed; dropping the last sender disconnects the workers.
    sender: RwLock<Option<Sender<RenderJob>>>,
    policy: Backpressure,
    capacity: usize,
    /// Jobs accepted but not yet fully processed by a worker.
    pending: Arc<AtomicUsize>,
    stats: Arc<PipelineStats>,
}

impl JobQueue {
    /// Create a queue and the receiver the workers drain.
    pub fn new(
        capacity: usize,
        policy: Backpressure,
        stats: Arc<PipelineStats>,
    ) -> (Self, Receiver<RenderJob>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let queue = Self {
            sender: RwLock::new(Some(sender)),
            policy,
            capacity,
            pending: Arc::new(AtomicUsize::new(0)),
            stats,
        };
        (queue, receiver)
    }

    /// Submit under the configured policy.
    pub fn submit(&self, job: RenderJob) -> Submitted {
        self.submit_with(job, self.policy)
    }

    /// Submit under an explicit policy. Warm-up uses `Block` so a large
    /// backfill is throttled rather than truncated.
    pub fn submit_with(&self, job: RenderJob, policy: Backpressure) -> Submitted {
        // Clone the sender so a blocking send never holds the lock.
        let Some(sender) = self.sender.read().clone() else {
            return Submitted::Closed;
        };

        // Count before sending so a fast worker cannot decrement first.
        self.pending.fetch_add(1, Ordering::SeqCst);

        let result = match policy {
            Backpressure::Drop => match sender.try_send(job) {
                Ok(()) => Submitted::Queued,
                Err(TrySendError::Full(job)) => {
                    tracing::warn!(
                        "[queue] full ({} jobs), dropping {}",
                        self.capacity,
                        job.path.display()
                    );
                    self.stats.record_dropped();
                    Submitted::Dropped
                }
                Err(TrySendError::Disconnected(_)) => Submitted::Closed,
            },
            Backpressure::Block => match sender.send(job) {
                Ok(()) => Submitted::Queued,
                Err(_) => Submitted::Closed,
            },
        };

        if result == Submitted::Queued {
            self.stats.record_queued();
        } else {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }

    /// Stop accepting jobs. Workers drain what is already queued.
    pub fn close(&self) {
        self.sender.write().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> Backpressure {
        self.policy
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pending)
    }
}
