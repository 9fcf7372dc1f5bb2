//! Runner trait and mode dispatch

use crate::concurrent::ConcurrentRunner;
use crate::context::ProgressCallback;
use crate::operation::TargetOperation;
use crate::sequential::SequentialRunner;
use crate::types::{BatchOptions, BatchResult, ExecutionMode};
use std::sync::Arc;

/// Drives a target operation over a fixed set of targets
///
/// Every call owns fresh counters and cancellation state, so one runner
/// value can be reused across batches without interference.
pub trait Runner {
    /// Process every target once (absent a fatal abort) and return the
    /// final counts. Zero targets yield `(0, 0, 0)` without calling the
    /// operation or the progress callback.
    fn run(
        &self,
        targets: &[String],
        operation: Arc<dyn TargetOperation>,
        progress: &mut dyn ProgressCallback,
    ) -> BatchResult;
}

/// Build the runner matching the options
pub fn runner_for(options: &BatchOptions) -> Box<dyn Runner> {
    match options.mode {
        ExecutionMode::Concurrent { workers } => Box::new(
            ConcurrentRunner::new(workers).with_abort_policy(options.abort_policy),
        ),
        ExecutionMode::Sequential { delay } => Box::new(SequentialRunner::new(delay)),
    }
}

/// Run a batch with the runner selected by `options.mode`
///
/// # Example
///
/// ```
/// use batchkit::{BatchOptions, ExecutionMode, NoProgress, Outcome, run};
/// use std::sync::Arc;
///
/// let targets = vec!["octo-org".to_string(), "octo-labs".to_string()];
/// let options = BatchOptions {
///     mode: ExecutionMode::concurrent(2).unwrap(),
///     ..Default::default()
/// };
///
/// let result = run(&targets, Arc::new(|_: &str| Outcome::Success), &options, &mut NoProgress);
/// assert_eq!(result.success, 2);
/// ```
pub fn run(
    targets: &[String],
    operation: Arc<dyn TargetOperation>,
    options: &BatchOptions,
    progress: &mut dyn ProgressCallback,
) -> BatchResult {
    runner_for(options).run(targets, operation, progress)
}
