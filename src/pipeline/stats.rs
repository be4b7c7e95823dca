use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the queue and the workers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    queued: AtomicU64,
    dropped: AtomicU64,
    debounced: AtomicU64,
    coalesced: AtomicU64,
    rendered: AtomicU64,
    cache_hits: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Jobs accepted by the queue
    pub queued: u64,
    /// Jobs rejected because the queue was full
    pub dropped: u64,
    /// Jobs discarded inside the debounce window
    pub debounced: u64,
    /// Jobs folded into a render already in flight for the same path
    pub coalesced: u64,
    pub rendered: u64,
    pub cache_hits: u64,
    pub failed: u64,
}

impl PipelineStats {
    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_debounced(&self) {
        self.debounced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rendered(&self) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            debounced: self.debounced.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
