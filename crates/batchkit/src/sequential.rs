//! Sequential runner - one target at a time with an optional delay

use crate::concurrent::process_guarded;
use crate::context::ProgressCallback;
use crate::operation::TargetOperation;
use crate::runner::Runner;
use crate::types::{BatchResult, Disposition, ExecutionMode, Tally};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Processes targets strictly in input order on the calling thread
///
/// Before the second and every later target the runner sleeps for the
/// configured delay. It never sleeps before the first target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialRunner {
    delay: Duration,
}

impl SequentialRunner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Runner for SequentialRunner {
    fn run(
        &self,
        targets: &[String],
        operation: Arc<dyn TargetOperation>,
        progress: &mut dyn ProgressCallback,
    ) -> BatchResult {
        let total = targets.len();
        if total == 0 {
            return BatchResult::default();
        }

        progress.on_batch_start(total, ExecutionMode::Sequential { delay: self.delay });
        log::debug!(
            "Processing {} targets sequentially ({}s delay)",
            total,
            self.delay.as_secs()
        );

        let mut tally = Tally::new();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                progress.on_wait(self.delay);
                thread::sleep(self.delay);
            }

            progress.on_target_start(target);
            let outcome = process_guarded(operation.as_ref(), target);
            let disposition = tally.record(&outcome);
            progress.on_target_complete(target, disposition);

            if let Disposition::Fatal(err) = disposition {
                log::error!("Fatal failure on '{}': {}", target, err);
                progress.on_abort(target, err);

                let remaining = total - (index + 1);
                tally.skip_remaining(remaining);
                if remaining > 0 {
                    progress.on_skip_remaining(remaining);
                }
                log::debug!("Stopped after {} of {} targets", index + 1, total);
                break;
            }
        }

        let result = tally.result();
        progress.on_batch_complete(&result);
        result
    }
}
