//! Progress reporting for paginated loads.
//!
//! The fetcher only knows row counts; how those are shown (a terminal bar,
//! log lines, nothing) is decided by the caller through
//! [`ProgressCallback`].

use std::sync::Arc;

/// Receives row-count updates while a load is paging through the provider.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of rows the load may retrieve at most.
    fn set_total(&self, total: u64);

    /// Records `delta` more rows retrieved.
    fn inc(&self, delta: u64);

    /// Replaces the status text.
    fn set_message(&self, msg: String);

    /// Marks the load as finished.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
