//! # Batchkit
//!
//! A small engine for applying one operation to many targets.
//!
//! The caller supplies a fixed list of target names and a [`TargetOperation`].
//! A runner walks the list, classifies every outcome, and returns a
//! [`BatchResult`] whose counts always add up to the number of targets.
//!
//! ## Core Concepts
//!
//! - **TargetOperation**: the work applied to one target, returning an [`Outcome`]
//! - **OperationError**: a failure tagged as skip-equivalent, fatal, or ordinary
//! - **ConcurrentRunner**: fixed worker pool; the first fatal failure stops new work
//! - **SequentialRunner**: input order, optional delay between targets
//!
//! ## Example
//!
//! ```
//! use batchkit::{BatchOptions, ExecutionMode, NoProgress, OperationError, Outcome, run};
//! use std::sync::Arc;
//!
//! let targets: Vec<String> = ["octo-org", "octo-labs", "octo-archive"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//!
//! let operation = |org: &str| match org {
//!     "octo-archive" => Outcome::skipped("not an owner"),
//!     "octo-labs" => Outcome::Failed(OperationError::skip_equivalent(anyhow::anyhow!(
//!         "configuration already exists"
//!     ))),
//!     _ => Outcome::Success,
//! };
//!
//! let options = BatchOptions {
//!     mode: ExecutionMode::concurrent(2)?,
//!     ..Default::default()
//! };
//! let result = run(&targets, Arc::new(operation), &options, &mut NoProgress);
//!
//! assert_eq!((result.success, result.skipped, result.errors), (1, 2, 0));
//! # Ok::<(), batchkit::ConfigError>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`TargetOperation`]: the per-target work
//! - [`ProgressCallback`]: receives progress updates from the consuming thread
//!
//! Neither trait ties the crate to an HTTP client or a terminal UI.

pub mod concurrent;
pub mod context;
pub mod operation;
pub mod runner;
pub mod sequential;
pub mod types;

// Re-export main types at crate root
pub use concurrent::ConcurrentRunner;
pub use context::{NoProgress, ProgressCallback};
pub use operation::TargetOperation;
pub use runner::{Runner, run, runner_for};
pub use sequential::SequentialRunner;
pub use types::{
    AbortPolicy, BatchOptions, BatchResult, ConfigError, Disposition, ErrorCategory,
    ExecutionMode, MAX_CONCURRENCY, MAX_DELAY_SECS, OperationError, Outcome, Tally,
};
