//! Progress reporting and cooperative cancellation.
//!
//! Long operations take a `&dyn ProgressSink`, report a percentage at
//! coarse checkpoints and poll [`ProgressSink::is_interrupted`] at the same
//! points. An interrupted operation returns `Ok` early; output written so
//! far stays in place.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Receiver of progress updates and source of cancellation requests.
pub trait ProgressSink: Send + Sync {
    /// Reports progress in percent, 0..=100.
    fn set_progress(&self, percent: u32);

    /// Returns `true` once the caller asked the operation to stop.
    fn is_interrupted(&self) -> bool {
        false
    }
}

/// Sink that ignores progress and never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_progress(&self, _percent: u32) {}
}

/// Thread-safe sink recording the last reported value.
///
/// # Example
///
/// ```rust
/// use pigment_ops::progress::{ProgressCounter, ProgressSink};
///
/// let progress = ProgressCounter::new();
/// progress.set_progress(40);
/// assert_eq!(progress.progress(), 40);
///
/// progress.cancel();
/// assert!(progress.is_interrupted());
/// ```
#[derive(Debug, Default)]
pub struct ProgressCounter {
    percent: AtomicU32,
    updates: AtomicU32,
    cancelled: AtomicBool,
    cancel_after: Option<u32>,
}

impl ProgressCounter {
    /// Creates a counter at 0%.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter that reports interruption once `updates` progress
    /// updates have been received.
    pub fn cancel_after(updates: u32) -> Self {
        Self {
            cancel_after: Some(updates),
            ..Self::default()
        }
    }

    /// Last reported percentage.
    pub fn progress(&self) -> u32 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Number of updates received.
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl ProgressSink for ProgressCounter {
    fn set_progress(&self, percent: u32) {
        self.percent.store(percent.min(100), Ordering::Relaxed);
        let n = self.updates.fetch_add(1, Ordering::Relaxed) + 1;
        if self.cancel_after.is_some_and(|limit| n >= limit) {
            self.cancel();
        }
    }

    fn is_interrupted(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Maps `done` of `total` steps to a percentage.
#[inline]
pub(crate) fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        100
    } else {
        ((done.min(total) * 100) / total) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clamps() {
        let p = ProgressCounter::new();
        p.set_progress(150);
        assert_eq!(p.progress(), 100);
        assert_eq!(p.updates(), 1);
        assert!(!p.is_interrupted());
    }

    #[test]
    fn test_cancel_after() {
        let p = ProgressCounter::cancel_after(2);
        p.set_progress(10);
        assert!(!p.is_interrupted());
        p.set_progress(20);
        assert!(p.is_interrupted());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(12, 10), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
