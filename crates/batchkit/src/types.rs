//! Core types for batch execution

use std::fmt;
use std::time::Duration;

/// Maximum number of workers the concurrent runner accepts
pub const MAX_CONCURRENCY: usize = 20;

/// Maximum delay between targets for the sequential runner, in seconds
pub const MAX_DELAY_SECS: u64 = 600;

/// Category of a target-level failure
///
/// The runner decides how to count a failure purely from its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Expected, non-exceptional condition (e.g. resource already exists).
    /// Counted as a skip.
    SkipEquivalent,
    /// The remaining targets cannot plausibly succeed. Stops the batch.
    Fatal,
    /// Any other failure. Counted as an error, other targets unaffected.
    Ordinary,
}

impl ErrorCategory {
    /// Get a short label for this category.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkipEquivalent => "skip-equivalent",
            Self::Fatal => "fatal",
            Self::Ordinary => "error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure returned by a target operation
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Operation reached the remote system and hit a predictable condition
    #[error("{0:#}")]
    SkipEquivalent(anyhow::Error),

    /// Operation hit a condition that dooms every remaining target
    #[error("{0:#}")]
    Fatal(anyhow::Error),

    /// Any other failure
    #[error("{0:#}")]
    Ordinary(anyhow::Error),
}

impl OperationError {
    /// Wrap an error as a skip-equivalent failure
    pub fn skip_equivalent(err: impl Into<anyhow::Error>) -> Self {
        Self::SkipEquivalent(err.into())
    }

    /// Wrap an error as a fatal failure
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(err.into())
    }

    /// Wrap an error as an ordinary failure
    pub fn ordinary(err: impl Into<anyhow::Error>) -> Self {
        Self::Ordinary(err.into())
    }

    /// Get the category used by the runners to count this failure
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SkipEquivalent(_) => ErrorCategory::SkipEquivalent,
            Self::Fatal(_) => ErrorCategory::Fatal,
            Self::Ordinary(_) => ErrorCategory::Ordinary,
        }
    }

    /// Borrow the wrapped error
    pub fn inner(&self) -> &anyhow::Error {
        match self {
            Self::SkipEquivalent(e) | Self::Fatal(e) | Self::Ordinary(e) => e,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Result of processing a single target
#[derive(Debug)]
pub enum Outcome {
    /// Operation completed and had an externally visible effect
    Success,
    /// Target was intentionally not operated on
    Skipped { reason: String },
    /// Operation was attempted and did not complete
    Failed(OperationError),
}

impl Outcome {
    /// Build a skipped outcome
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl From<Result<(), OperationError>> for Outcome {
    fn from(result: Result<(), OperationError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failed(e),
        }
    }
}

/// How a received outcome was counted
#[derive(Debug, Clone, Copy)]
pub enum Disposition<'a> {
    /// Counted as success
    Succeeded,
    /// Counted as skipped, reported by the operation itself
    Skipped(&'a str),
    /// Counted as skipped after reclassifying a skip-equivalent failure
    Excused(&'a OperationError),
    /// Counted as an error
    Failed(&'a OperationError),
    /// Counted as an error and stops the batch
    Fatal(&'a OperationError),
}

/// Final counts for one batch run
///
/// After every run `success + skipped + errors` equals the number of
/// targets handed to the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl BatchResult {
    /// Total number of targets accounted for
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.errors
    }

    /// Check if the run finished without errors
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {}, Skipped: {}, Errors: {}",
            self.success, self.skipped, self.errors
        )
    }
}

/// Result aggregator shared by both runners
///
/// Owns the reclassification rule: skip-equivalent failures are skips,
/// everything else that failed is an error.
#[derive(Debug, Default)]
pub struct Tally {
    result: BatchResult,
    received: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome and report how it was counted
    pub fn record<'a>(&mut self, outcome: &'a Outcome) -> Disposition<'a> {
        self.received += 1;
        match outcome {
            Outcome::Success => {
                self.result.success += 1;
                Disposition::Succeeded
            }
            Outcome::Skipped { reason } => {
                self.result.skipped += 1;
                Disposition::Skipped(reason)
            }
            Outcome::Failed(err) => match err.category() {
                ErrorCategory::SkipEquivalent => {
                    self.result.skipped += 1;
                    Disposition::Excused(err)
                }
                ErrorCategory::Fatal => {
                    self.result.errors += 1;
                    Disposition::Fatal(err)
                }
                ErrorCategory::Ordinary => {
                    self.result.errors += 1;
                    Disposition::Failed(err)
                }
            },
        }
    }

    /// Count targets that will never produce an outcome as skipped
    pub fn skip_remaining(&mut self, count: usize) {
        self.result.skipped += count;
    }

    /// Number of outcomes recorded so far
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn result(&self) -> BatchResult {
        self.result
    }
}

/// What to do with outcomes still in flight when a fatal failure stops the
/// concurrent runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AbortPolicy {
    /// Count every outcome not yet received as skipped and drain the rest
    /// in the background without looking at them
    #[default]
    Discard,
    /// Wait for in-flight targets to finish and count their outcomes
    /// normally; only targets that never started are skipped
    FoldIn,
}

impl AbortPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::FoldIn => "fold-in",
        }
    }
}

impl fmt::Display for AbortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AbortPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "fold-in" | "fold_in" | "foldin" => Ok(Self::FoldIn),
            other => Err(ConfigError::UnknownAbortPolicy(other.to_string())),
        }
    }
}

/// How targets are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Fixed pool of workers pulling from a shared queue
    Concurrent { workers: usize },
    /// One target at a time, in input order, sleeping between targets
    Sequential { delay: Duration },
}

impl ExecutionMode {
    /// Build a mode from the two mutually exclusive user parameters
    ///
    /// A delay selects the sequential runner; otherwise the concurrent
    /// runner is used with `concurrency` workers (default 1).
    pub fn from_flags(
        concurrency: Option<usize>,
        delay_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        match (concurrency, delay_secs) {
            (Some(c), Some(d)) if c > 1 => Err(ConfigError::ConflictingModes {
                concurrency: c,
                delay: d,
            }),
            (_, Some(d)) => Self::sequential(d),
            (c, None) => Self::concurrent(c.unwrap_or(1)),
        }
    }

    /// Concurrent mode with a validated worker count
    pub fn concurrent(workers: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_CONCURRENCY).contains(&workers) {
            return Err(ConfigError::InvalidConcurrency(workers));
        }
        Ok(Self::Concurrent { workers })
    }

    /// Sequential mode with a validated delay in seconds
    pub fn sequential(delay_secs: u64) -> Result<Self, ConfigError> {
        if !(1..=MAX_DELAY_SECS).contains(&delay_secs) {
            return Err(ConfigError::InvalidDelay(delay_secs));
        }
        Ok(Self::Sequential {
            delay: Duration::from_secs(delay_secs),
        })
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential { .. })
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Concurrent { workers: 1 }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concurrent { workers } => write!(f, "concurrency {workers}"),
            Self::Sequential { delay } => {
                write!(f, "sequential, {}s delay", delay.as_secs())
            }
        }
    }
}

/// Options for a batch run
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub mode: ExecutionMode,
    pub abort_policy: AbortPolicy,
}

/// Invalid runner configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be between 1 and 20, got {0}")]
    InvalidConcurrency(usize),

    #[error("delay must be between 1 and 600 seconds, got {0}")]
    InvalidDelay(u64),

    #[error(
        "--concurrency ({concurrency}) and --delay ({delay}) cannot be combined; delay processing is sequential"
    )]
    ConflictingModes { concurrency: usize, delay: u64 },

    #[error("unknown abort policy '{0}' (expected 'discard' or 'fold-in')")]
    UnknownAbortPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn already_exists() -> Outcome {
        Outcome::Failed(OperationError::skip_equivalent(anyhow::anyhow!(
            "configuration 'baseline' already exists"
        )))
    }

    #[test]
    fn test_tally_counts_each_kind() {
        let outcomes = vec![
            Outcome::Success,
            Outcome::skipped("not an owner"),
            already_exists(),
            Outcome::Failed(OperationError::ordinary(anyhow::anyhow!("HTTP 500"))),
            Outcome::Failed(OperationError::fatal(anyhow::anyhow!("feature unavailable"))),
        ];

        let mut tally = Tally::new();
        for outcome in &outcomes {
            tally.record(outcome);
        }

        assert_eq!(
            tally.result(),
            BatchResult {
                success: 1,
                skipped: 2,
                errors: 2,
            }
        );
        assert_eq!(tally.received(), 5);
    }

    #[test]
    fn test_tally_reclassifies_skip_equivalent() {
        let outcome = already_exists();
        let mut tally = Tally::new();

        let disposition = tally.record(&outcome);

        assert!(matches!(disposition, Disposition::Excused(_)));
        assert_eq!(tally.result().skipped, 1);
        assert_eq!(tally.result().errors, 0);
    }

    #[test]
    fn test_tally_fatal_is_an_error() {
        let outcome = Outcome::Failed(OperationError::fatal(anyhow::anyhow!("boom")));
        let mut tally = Tally::new();

        assert!(matches!(tally.record(&outcome), Disposition::Fatal(_)));
        tally.skip_remaining(3);

        assert_eq!(
            tally.result(),
            BatchResult {
                success: 0,
                skipped: 3,
                errors: 1,
            }
        );
        assert_eq!(tally.received(), 1);
    }

    #[test]
    fn test_operation_error_category() {
        assert_eq!(
            OperationError::skip_equivalent(anyhow::anyhow!("x")).category(),
            ErrorCategory::SkipEquivalent
        );
        assert_eq!(
            OperationError::fatal(anyhow::anyhow!("x")).category(),
            ErrorCategory::Fatal
        );
        assert_eq!(
            OperationError::ordinary(anyhow::anyhow!("x")).category(),
            ErrorCategory::Ordinary
        );
    }

    #[test]
    fn test_operation_error_display_includes_context() {
        let err = anyhow::anyhow!("HTTP 404").context("failed to delete security configuration");
        let display = OperationError::ordinary(err).to_string();
        assert!(display.contains("failed to delete security configuration"));
        assert!(display.contains("HTTP 404"));
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(Outcome::from(Ok(())).is_success());
        let failed = Outcome::from(Err(OperationError::ordinary(anyhow::anyhow!("x"))));
        assert!(failed.is_failed());
    }

    #[test]
    fn test_mode_from_flags_defaults_to_single_worker() {
        assert_eq!(
            ExecutionMode::from_flags(None, None).unwrap(),
            ExecutionMode::Concurrent { workers: 1 }
        );
    }

    #[test]
    fn test_mode_from_flags_delay_selects_sequential() {
        let mode = ExecutionMode::from_flags(None, Some(5)).unwrap();
        assert_eq!(
            mode,
            ExecutionMode::Sequential {
                delay: Duration::from_secs(5)
            }
        );
        // concurrency 1 is the default value and may accompany a delay
        assert!(ExecutionMode::from_flags(Some(1), Some(5)).unwrap().is_sequential());
    }

    #[test]
    fn test_mode_from_flags_rejects_both() {
        let err = ExecutionMode::from_flags(Some(4), Some(5)).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingModes { .. }));
    }

    #[test]
    fn test_mode_bounds() {
        assert!(ExecutionMode::concurrent(0).is_err());
        assert!(ExecutionMode::concurrent(1).is_ok());
        assert!(ExecutionMode::concurrent(20).is_ok());
        assert_eq!(
            ExecutionMode::concurrent(21).unwrap_err(),
            ConfigError::InvalidConcurrency(21)
        );
        assert!(ExecutionMode::sequential(0).is_err());
        assert!(ExecutionMode::sequential(600).is_ok());
        assert_eq!(
            ExecutionMode::sequential(601).unwrap_err(),
            ConfigError::InvalidDelay(601)
        );
    }

    #[test]
    fn test_abort_policy_parse() {
        assert_eq!("discard".parse::<AbortPolicy>().unwrap(), AbortPolicy::Discard);
        assert_eq!("fold-in".parse::<AbortPolicy>().unwrap(), AbortPolicy::FoldIn);
        assert_eq!("Fold_In".parse::<AbortPolicy>().unwrap(), AbortPolicy::FoldIn);
        assert!("later".parse::<AbortPolicy>().is_err());
        assert_eq!(AbortPolicy::default(), AbortPolicy::Discard);
    }

    #[test]
    fn test_batch_result_display() {
        let result = BatchResult {
            success: 3,
            skipped: 1,
            errors: 0,
        };
        assert_eq!(result.to_string(), "Success: 3, Skipped: 1, Errors: 0");
        assert!(result.is_success());
        assert_eq!(result.total(), 4);
    }
}
