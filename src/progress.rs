//! Progress-callback trait for per-column scan events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to receive events
//! as each column is recognised. Columns are recognised concurrently, so
//! the column-level methods may be called from several tasks at once.
//!
//! # Example
//!
//! ```rust
//! use scoresheet2pgn::{ScanConfig, ScanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ScanProgressCallback for Counter {
//!     fn on_column_complete(&self, _page: usize, _column: usize, _total: usize, _lines: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ScanConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the scan pipeline as it works through the columns.
///
/// All methods default to no-ops. `page` and `column` are 1-indexed;
/// `total` is the number of columns across all pages.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once, after geometry, before the first recogniser call.
    fn on_scan_start(&self, total_columns: usize) {
        let _ = total_columns;
    }

    /// Called just before a column is sent to the recogniser.
    fn on_column_start(&self, page: usize, column: usize, total: usize) {
        let _ = (page, column, total);
    }

    /// Called when a column was transcribed; `lines` counts non-empty lines.
    fn on_column_complete(&self, page: usize, column: usize, total: usize, lines: usize) {
        let _ = (page, column, total, lines);
    }

    /// Called when a column failed after all retries.
    fn on_column_error(&self, page: usize, column: usize, total: usize, error: &str) {
        let _ = (page, column, total, error);
    }

    /// Called once after every column has been attempted.
    fn on_scan_complete(&self, total_columns: usize, succeeded: usize) {
        let _ = (total_columns, succeeded);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ScanProgressCallback for Tracking {
        fn on_column_start(&self, _page: usize, _column: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_column_complete(&self, _page: usize, _column: usize, _total: usize, _lines: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_column_error(&self, _page: usize, _column: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_scan_complete(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_scan_start(4);
        cb.on_column_start(1, 1, 4);
        cb.on_column_complete(1, 1, 4, 12);
        cb.on_column_error(1, 2, 4, "timeout");
        cb.on_scan_complete(4, 3);
    }

    #[test]
    fn tracking_callback_through_arc() {
        let tracker = Arc::new(Tracking::default());
        let cb: ProgressCallback = tracker.clone();
        cb.on_column_start(1, 1, 2);
        cb.on_column_complete(1, 1, 2, 20);
        cb.on_column_start(1, 2, 2);
        cb.on_column_error(1, 2, 2, "provider down");
        cb.on_scan_complete(2, 1);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }
}
