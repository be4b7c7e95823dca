//! Per-path debouncing of render jobs.
//!
//! Editors often write a file and touch it again right after, which shows
//! up as a burst of events for one path. Only the first job in a window
//! is let through.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default debounce window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Debounces jobs by source path.
///
/// Lookup and update happen under one lock acquisition, so two concurrent
/// admissions of the same path cannot both pass.
#[derive(Debug)]
pub struct Debouncer {
    /// Path -> time the last admitted job was seen.
    last_admitted: Mutex<HashMap<PathBuf, Instant>>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            last_admitted: Mutex::new(HashMap::new()),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit a job for `path` now.
    pub fn admit(&self, path: &Path) -> bool {
        self.admit_at(path, Instant::now())
    }

    /// Admit a job for `path` at `now`.
    ///
    /// Discards when the previous admission is strictly less than one
    /// window ago. A job arriving exactly at the boundary is admitted.
    pub fn admit_at(&self, path: &Path, now: Instant) -> bool {
        let mut last_admitted = self.last_admitted.lock();
        if let Some(last) = last_admitted.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        last_admitted.insert(path.to_path_buf(), now);
        true
    }

    /// Drop the record for a path (e.g. when the source is deleted), so a
    /// recreated file renders without waiting out the window.
    pub fn forget(&self, path: &Path) {
        self.last_admitted.lock().remove(path);
    }

    /// Drop records older than one window. They can no longer discard anything.
    pub fn prune(&self, now: Instant) -> usize {
        let mut last_admitted = self.last_admitted.lock();
        let before = last_admitted.len();
        last_admitted.retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before - last_admitted.len()
    }

    pub fn tracked_count(&self) -> usize {
        self.last_admitted.lock().len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_burst_within_window_admits_once() {
        let debouncer = Debouncer::new(Duration::from_secs(1));
        let path = PathBuf::from("/docs/a.tex");
        let t0 = Instant::now();

        assert!(debouncer.admit_at(&path, t0));
        assert!(!debouncer.admit_at(&path, t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_spaced_jobs_both_admitted() {
        let debouncer = Debouncer::new(Duration::from_secs(1));
        let path = PathBuf::from("/docs/a.tex");
        let t0 = Instant::now();

        assert!(debouncer.admit_at(&path, t0));
        assert!(debouncer.admit_at(&path, t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn test_boundary_is_admitted() {
        let debouncer = Debouncer::new(Duration::from_secs(1));
        let path = PathBuf::from("/docs/a.tex");
        let t0 = Instant::now();

        assert!(debouncer.admit_at(&path, t0));
        assert!(debouncer.admit_at(&path, t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_discard_does_not_extend_window() {
        let debouncer = Debouncer::new(Duration::from_secs(1));
        let path = PathBuf::from("/docs/a.tex");
        let t0 = Instant::now();

        assert!(debouncer.admit_at(&path, t0));
        assert!(!debouncer.admit_at(&path, t0 + Duration::from_millis(900)));
        // Measured from the admitted job, not the discarded one
        assert!(debouncer.admit_at(&path, t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_paths_are_independent() {
        let debouncer = Debouncer::default();
        let t0 = Instant::now();

        assert!(debouncer.admit_at(Path::new("/docs/a.tex"), t0));
        assert!(debouncer.admit_at(Path::new("/docs/b.tex"), t0));
        assert_eq!(debouncer.tracked_count(), 2);
    }

    #[test]
    fn test_forget_and_prune() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let path = PathBuf::from("/docs/a.tex");
        let t0 = Instant::now();

        assert!(debouncer.admit_at(&path, t0));
        debouncer.forget(&path);
        assert!(debouncer.admit_at(&path, t0 + Duration::from_millis(1)));

        assert_eq!(debouncer.prune(t0 + Duration::from_millis(10)), 0);
        assert_eq!(debouncer.prune(t0 + Duration::from_millis(100)), 1);
        assert_eq!(debouncer.tracked_count(), 0);
    }

    #[test]
    fn test_concurrent_admission_passes_once() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_secs(10)));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let debouncer = Arc::clone(&debouncer);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    if debouncer.admit(Path::new("/docs/race.tex")) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
