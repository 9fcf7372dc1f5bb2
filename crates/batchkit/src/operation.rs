//! Target operation trait
//!
//! A target operation is the unit of work applied to one target. Each
//! concrete batch action carries only the parameters it needs and
//! implements this single-method contract.

use crate::types::Outcome;

/// Work applied to a single target
///
/// Implementations must report "skip" conditions idempotently: calling
/// `process` twice on the same target without an intervening state change
/// yields the same skip. Side effects on success need not be idempotent;
/// a repeated create that finds its own earlier result should surface that
/// as a skip-equivalent failure, not an ordinary one.
///
/// # Example
///
/// ```
/// use batchkit::{Outcome, TargetOperation};
///
/// struct Greet;
///
/// impl TargetOperation for Greet {
///     fn process(&self, target: &str) -> Outcome {
///         if target.is_empty() {
///             return Outcome::skipped("empty name");
///         }
///         Outcome::Success
///     }
/// }
///
/// assert!(Greet.process("octo-org").is_success());
/// ```
pub trait TargetOperation: Send + Sync {
    /// Process one target and report what happened
    fn process(&self, target: &str) -> Outcome;
}

impl<F> TargetOperation for F
where
    F: Fn(&str) -> Outcome + Send + Sync,
{
    fn process(&self, target: &str) -> Outcome {
        self(target)
    }
}
