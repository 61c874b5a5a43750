//! Progress reporting for long-running enrichment runs.
//!
//! The orchestrator reports one unit of work per record through
//! [`ProgressCallback`]; binaries decide how (or whether) to render it.

use std::sync::Arc;

/// Receives progress updates from a batch run.
///
/// Implementations must be `Send + Sync` so a single reporter can be shared
/// through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of records expected.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` records.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the run as complete with a final message.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by tests and non-interactive callers.
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
