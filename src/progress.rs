//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch runner works through its files.
//!
//! Events are advisory: a callback cannot change which files are processed
//! or the order in which their records are accumulated.
//!
//! # Example
//!
//! ```rust
//! use edgequake_authors::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total_files: usize, record_count: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("File {}/{} done ({} authors)", index, total_files, record_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::batch::BatchRunner`] as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file is rendered.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file enters the pipeline.
    fn on_file_start(&self, index: usize, total_files: usize, source_file: &str) {
        let _ = (index, total_files, source_file);
    }

    /// Called when a file produced its author records (possibly zero).
    fn on_file_complete(&self, index: usize, total_files: usize, record_count: usize) {
        let _ = (index, total_files, record_count);
    }

    /// Called when a file was turned into an error row.
    fn on_file_error(&self, index: usize, total_files: usize, error: &str) {
        let _ = (index, total_files, error);
    }

    /// Called after every file, success or failure, with the completed fraction in `0.0..=1.0`.
    fn on_progress(&self, fraction: f64) {
        let _ = fraction;
    }

    /// Called once after the last file (or after cancellation).
    fn on_batch_complete(&self, files_processed: usize, files_failed: usize) {
        let _ = (files_processed, files_failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Fraction of `total` files finished after `done`; an empty batch counts as complete.
pub fn completed_fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        fractions: Mutex<Vec<f64>>,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.started_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _record_count: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_progress(&self, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_file_start(1, 3, "a.pdf");
        cb.on_file_complete(1, 3, 4);
        cb.on_file_error(2, 3, "boom");
        cb.on_progress(0.5);
        cb.on_batch_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(2);
        tracker.on_file_complete(1, 2, 3);
        tracker.on_progress(completed_fraction(1, 2));
        tracker.on_file_error(2, 2, "timeout");
        tracker.on_progress(completed_fraction(2, 2));

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.fractions.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn fraction_of_empty_batch_is_complete() {
        assert_eq!(completed_fraction(0, 0), 1.0);
        assert_eq!(completed_fraction(1, 4), 0.25);
    }
}
