//! Progress reporting for archive rewrites.
//!
//! A rewrite runs to completion or failure; there is no cancellation, so the
//! callbacks here only observe. [`AtomicProgress`] can be shared with a UI
//! thread that polls it while the rewrite runs in the background.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use zipcull::progress::{AtomicProgress, ProgressReporter};
//!
//! let progress = AtomicProgress::shared();
//! let mut reporter: Arc<AtomicProgress> = Arc::clone(&progress);
//! reporter.on_total(2, 100);
//! reporter.on_entry_complete("a.txt", true);
//! reporter.on_progress(40, 100);
//!
//! assert_eq!(progress.entries_done(), 1);
//! assert!((progress.percentage() - 40.0).abs() < 0.001);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Observer of a running rewrite.
///
/// Every method has an empty default, so implementors only override what
/// they need.
pub trait ProgressReporter: Send {
    /// Called once before the first entry with the entry count and the
    /// total compressed bytes of the source archive.
    fn on_total(&mut self, entries: usize, total_bytes: u64) {
        let _ = (entries, total_bytes);
    }

    /// Called after each entry with the source bytes handled so far.
    fn on_progress(&mut self, bytes_processed: u64, total_bytes: u64) {
        let _ = (bytes_processed, total_bytes);
    }

    /// Called when the rewriter reaches an entry.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when an entry is done; `kept` is `false` for deleted entries.
    fn on_entry_complete(&mut self, entry_name: &str, kept: bool) {
        let _ = (entry_name, kept);
    }
}

/// A progress reporter that does nothing (null object pattern).
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A thread-safe progress reporter using atomics.
///
/// Allows progress to be monitored from another thread.
#[derive(Debug)]
pub struct AtomicProgress {
    total_bytes: AtomicU64,
    processed_bytes: AtomicU64,
    entries_total: AtomicUsize,
    entries_done: AtomicUsize,
    entries_deleted: AtomicUsize,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Creates a new atomic progress reporter.
    pub fn new() -> Self {
        Self {
            total_bytes: AtomicU64::new(0),
            processed_bytes: AtomicU64::new(0),
            entries_total: AtomicUsize::new(0),
            entries_done: AtomicUsize::new(0),
            entries_deleted: AtomicUsize::new(0),
        }
    }

    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns total bytes to process.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Returns processed bytes.
    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    /// Returns the number of entries in the source archive.
    pub fn entries_total(&self) -> usize {
        self.entries_total.load(Ordering::Relaxed)
    }

    /// Returns the number of entries handled so far.
    pub fn entries_done(&self) -> usize {
        self.entries_done.load(Ordering::Relaxed)
    }

    /// Returns the number of entries left out so far.
    pub fn entries_deleted(&self) -> usize {
        self.entries_deleted.load(Ordering::Relaxed)
    }

    /// Returns completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            0.0
        } else {
            (self.processed_bytes() as f64 / total as f64) * 100.0
        }
    }

    fn record_total(&self, entries: usize, total_bytes: u64) {
        self.entries_total.store(entries, Ordering::Relaxed);
        self.total_bytes.store(total_bytes, Ordering::Relaxed);
    }

    fn record_progress(&self, bytes_processed: u64) {
        self.processed_bytes.store(bytes_processed, Ordering::Relaxed);
    }

    fn record_entry(&self, kept: bool) {
        self.entries_done.fetch_add(1, Ordering::Relaxed);
        if !kept {
            self.entries_deleted.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_total(&mut self, entries: usize, total_bytes: u64) {
        self.record_total(entries, total_bytes);
    }

    fn on_progress(&mut self, bytes_processed: u64, _total_bytes: u64) {
        self.record_progress(bytes_processed);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, kept: bool) {
        self.record_entry(kept);
    }
}

/// Progress reporter for shared `Arc<AtomicProgress>`.
impl ProgressReporter for Arc<AtomicProgress> {
    fn on_total(&mut self, entries: usize, total_bytes: u64) {
        self.record_total(entries, total_bytes);
    }

    fn on_progress(&mut self, bytes_processed: u64, _total_bytes: u64) {
        self.record_progress(bytes_processed);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, kept: bool) {
        self.record_entry(kept);
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Box<P> {
    fn on_total(&mut self, entries: usize, total_bytes: u64) {
        (**self).on_total(entries, total_bytes);
    }

    fn on_progress(&mut self, bytes_processed: u64, total_bytes: u64) {
        (**self).on_progress(bytes_processed, total_bytes);
    }

    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        (**self).on_entry_start(entry_name, size);
    }

    fn on_entry_complete(&mut self, entry_name: &str, kept: bool) {
        (**self).on_entry_complete(entry_name, kept);
    }
}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(u64, u64) + Send,
{
    /// Creates a progress reporter from a closure.
    ///
    /// The closure receives `(bytes_processed, total_bytes)`.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(u64, u64) + Send,
{
    fn on_progress(&mut self, bytes_processed: u64, total_bytes: u64) {
        (self.callback)(bytes_processed, total_bytes);
    }
}

/// Creates a closure-based progress reporter.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(u64, u64) + Send,
{
    ClosureProgress::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_progress() {
        let mut progress = NoProgress;
        progress.on_total(1, 10);
        progress.on_progress(5, 10);
        progress.on_entry_complete("a.txt", true);
    }

    #[test]
    fn test_atomic_progress() {
        let progress = AtomicProgress::shared();
        let mut reporter: Arc<AtomicProgress> = Arc::clone(&progress);

        reporter.on_total(3, 1000);
        reporter.on_entry_complete("keep.txt", true);
        reporter.on_entry_complete("drop.txt", false);
        reporter.on_progress(500, 1000);

        assert_eq!(progress.entries_total(), 3);
        assert_eq!(progress.entries_done(), 2);
        assert_eq!(progress.entries_deleted(), 1);
        assert_eq!(progress.processed_bytes(), 500);
        assert!((progress.percentage() - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_atomic_progress_across_threads() {
        let progress = AtomicProgress::shared();
        let mut reporter = Arc::clone(&progress);
        std::thread::spawn(move || {
            reporter.on_total(1, 10);
            reporter.on_progress(10, 10);
        })
        .join()
        .unwrap();
        assert!((progress.percentage() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_percentage_with_zero_total() {
        assert_eq!(AtomicProgress::new().percentage(), 0.0);
    }

    #[test]
    fn test_closure_progress() {
        let mut seen = Vec::new();
        {
            let mut reporter = progress_fn(|done, total| seen.push((done, total)));
            reporter.on_progress(1, 4);
            reporter.on_progress(4, 4);
        }
        assert_eq!(seen, vec![(1, 4), (4, 4)]);
    }

    #[test]
    fn test_boxed_reporter() {
        let progress = AtomicProgress::shared();
        let mut boxed: Box<dyn ProgressReporter> = Box::new(Arc::clone(&progress));
        boxed.on_entry_complete("x", false);
        assert_eq!(progress.entries_deleted(), 1);
    }
}
