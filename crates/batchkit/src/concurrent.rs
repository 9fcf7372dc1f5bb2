//! Concurrent runner - fixed worker pool with one-shot cancellation
//!
//! Layout of one run:
//!
//! ```text
//!   queue (pre-loaded, closed) ──► worker 0..N ──► results ──► consumer (caller thread)
//!                                     ▲                             │
//!                                     └──────── stop signal ◄───────┘ (first fatal)
//! ```
//!
//! The calling thread is the only consumer of the result channel and the
//! only writer of the counters. Workers look at the stop signal between
//! targets; a call already in progress always runs to completion.

use crate::context::ProgressCallback;
use crate::operation::TargetOperation;
use crate::runner::Runner;
use crate::types::{
    AbortPolicy, BatchResult, Disposition, ExecutionMode, OperationError, Outcome, Tally,
};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, select};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Runs targets on a fixed pool of worker threads
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentRunner {
    workers: usize,
    abort_policy: AbortPolicy,
}

impl ConcurrentRunner {
    /// Create a runner with `workers` threads (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            abort_policy: AbortPolicy::default(),
        }
    }

    pub fn with_abort_policy(mut self, abort_policy: AbortPolicy) -> Self {
        self.abort_policy = abort_policy;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn abort_policy(&self) -> AbortPolicy {
        self.abort_policy
    }
}

/// Counters and cancellation for a single run
struct RunState {
    tally: Tally,
    /// Dropping this sender closes the stop channel. `None` once stopped.
    stop: Option<Sender<()>>,
}

impl RunState {
    /// Fire the stop signal. Returns `true` only for the first caller.
    fn trigger_stop(&mut self) -> bool {
        match self.stop.take() {
            Some(stop) => {
                drop(stop);
                true
            }
            None => false,
        }
    }
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

type Completed = (String, Outcome);

impl Runner for ConcurrentRunner {
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

        progress.on_batch_start(
            total,
            ExecutionMode::Concurrent {
                workers: self.workers,
            },
        );

        // The work set is fixed: load everything, then close the queue.
        let (queue_tx, queue_rx) = channel::bounded::<String>(total);
        for target in targets {
            if queue_tx.send(target.clone()).is_err() {
                break;
            }
        }
        drop(queue_tx);

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let (result_tx, result_rx) = channel::bounded::<Completed>(total);
        let state = Mutex::new(RunState {
            tally: Tally::new(),
            stop: Some(stop_tx),
        });

        let handles = spawn_workers(self.workers, &queue_rx, &stop_rx, &result_tx, &operation);
        drop(result_tx);
        drop(queue_rx);
        drop(stop_rx);
        supervise(handles);

        let mut aborted = false;
        // ends when every worker has exited and dropped its sender
        while let Ok((target, outcome)) = result_rx.recv() {
            let (disposition, first_fatal) = {
                let mut state = lock(&state);
                let disposition = state.tally.record(&outcome);
                let first_fatal =
                    matches!(disposition, Disposition::Fatal(_)) && state.trigger_stop();
                (disposition, first_fatal)
            };

            progress.on_target_complete(&target, disposition);

            if let Disposition::Fatal(err) = disposition {
                if first_fatal {
                    log::error!("Fatal failure on '{}', stopping remaining work: {}", target, err);
                    progress.on_abort(&target, err);
                    aborted = true;
                    if self.abort_policy == AbortPolicy::Discard {
                        break;
                    }
                } else {
                    log::debug!("Additional fatal failure on '{}' after stop", target);
                }
            }
        }

        if aborted && self.abort_policy == AbortPolicy::Discard {
            drain_in_background(result_rx);
        }

        let (result, remaining) = {
            let mut state = lock(&state);
            let remaining = total.saturating_sub(state.tally.received());
            state.tally.skip_remaining(remaining);
            (state.tally.result(), remaining)
        };
        if remaining > 0 {
            if !aborted {
                log::warn!("{} targets produced no outcome; counting them as skipped", remaining);
            }
            progress.on_skip_remaining(remaining);
        }

        progress.on_batch_complete(&result);
        result
    }
}

fn spawn_workers(
    count: usize,
    queue: &Receiver<String>,
    stop: &Receiver<()>,
    results: &Sender<Completed>,
    operation: &Arc<dyn TargetOperation>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let queue = queue.clone();
        let stop = stop.clone();
        let results = results.clone();
        let operation = Arc::clone(operation);

        let spawned = thread::Builder::new()
            .name(format!("batch-worker-{id}"))
            .spawn(move || worker(id, &queue, &stop, &results, operation.as_ref()));

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => log::error!("Failed to spawn batch worker {}: {}", id, e),
        }
    }
    handles
}

/// Join every worker off the calling thread and report any that died
fn supervise(handles: Vec<JoinHandle<()>>) {
    let spawned = thread::Builder::new()
        .name("batch-supervisor".to_string())
        .spawn(move || {
            for handle in handles {
                let name = handle.thread().name().unwrap_or("batch-worker").to_string();
                if handle.join().is_err() {
                    log::error!("{} exited abnormally", name);
                }
            }
            log::trace!("All batch workers finished");
        });

    if let Err(e) = spawned {
        // Workers are detached; the result channel still closes when they exit.
        log::debug!("Failed to spawn batch supervisor: {}", e);
    }
}

fn worker(
    id: usize,
    queue: &Receiver<String>,
    stop: &Receiver<()>,
    results: &Sender<Completed>,
    operation: &dyn TargetOperation,
) {
    loop {
        if is_stopped(stop) {
            break;
        }

        // `None` when the queue is drained or the batch was stopped
        let next = select! {
            recv(queue) -> msg => msg.ok(),
            recv(stop) -> _ => None,
        };
        let Some(target) = next else {
            break;
        };

        // select! picks randomly when both are ready
        if is_stopped(stop) {
            log::debug!("Worker {} leaving '{}' unprocessed after stop", id, target);
            break;
        }

        log::trace!("Worker {} processing '{}'", id, target);
        let outcome = process_guarded(operation, &target);

        if results.send((target, outcome)).is_err() {
            // consumer is gone
            break;
        }
    }
    log::trace!("Worker {} exiting", id);
}

fn is_stopped(stop: &Receiver<()>) -> bool {
    matches!(stop.try_recv(), Err(TryRecvError::Disconnected))
}

/// Invoke the operation, turning a panic into an ordinary failure
pub(crate) fn process_guarded(operation: &dyn TargetOperation, target: &str) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| operation.process(target))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Outcome::Failed(OperationError::ordinary(anyhow::anyhow!(
                "operation panicked on '{}': {}",
                target,
                message
            )))
        }
    }
}

/// Discard outcomes that arrive after a fatal abort
fn drain_in_background(results: Receiver<Completed>) {
    let spawned = thread::Builder::new()
        .name("batch-drain".to_string())
        .spawn(move || {
            for (target, _) in results.iter() {
                log::debug!("Discarding outcome for '{}' received after stop", target);
            }
        });

    if let Err(e) = spawned {
        // Dropping the receiver makes pending sends fail, which ends the workers.
        log::debug!("Failed to spawn drain thread: {}", e);
    }
}
