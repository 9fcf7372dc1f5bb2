//! Progress callback trait
//!
//! Runners report through this trait so the crate does not depend on a
//! particular terminal UI. Only the runner's consuming thread calls it,
//! so implementations need no synchronization of their own.

use crate::types::{BatchResult, Disposition, ExecutionMode, OperationError};
use std::time::Duration;

/// Progress callback for batch runs
pub trait ProgressCallback: Send {
    /// Called once before any target is processed
    fn on_batch_start(&mut self, total: usize, mode: ExecutionMode);

    /// Called before the sequential runner sleeps between two targets
    fn on_wait(&mut self, _delay: Duration) {}

    /// Called when the sequential runner starts a target
    ///
    /// The concurrent runner does not report starts; its workers never
    /// touch the callback.
    fn on_target_start(&mut self, _target: &str) {}

    /// Called once per received outcome, after it was counted
    fn on_target_complete(&mut self, target: &str, disposition: Disposition<'_>);

    /// Called when a fatal failure stops the batch
    fn on_abort(&mut self, _target: &str, _error: &OperationError) {}

    /// Called with the number of targets counted as skipped because the
    /// batch stopped before they produced an outcome
    fn on_skip_remaining(&mut self, _count: usize) {}

    /// Called once with the final counts
    fn on_batch_complete(&mut self, _result: &BatchResult) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _total: usize, _mode: ExecutionMode) {}
    fn on_target_complete(&mut self, _target: &str, _disposition: Disposition<'_>) {}
}
