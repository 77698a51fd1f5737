//! Error types for the task engine.
//!
//! Two kinds of errors leave the engine as ordinary Rust errors rather than
//! through a task's failure channel:
//!
//! - [`TaskError`]: contract violations, raised synchronously at the point
//!   of misuse (racing an empty set of tasks, exhausting a synchronous
//!   driver's step budget).
//! - [`AggregateFailure`]: the single error value a task's failure sequence
//!   collapses into when it exits through [`Task::to_future`]. It keeps every
//!   individual failure.
//!
//! [`Task::to_future`]: crate::Task::to_future

use core::fmt::Write as _;

use thiserror::Error;

use crate::failure::{Failure, Failures};

/// A contract violation detected by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TaskError {
    /// `race` was given no tasks.
    #[error("no tasks to race")]
    NoTasksToRace,
    /// A trampoline drive exceeded its configured step budget.
    #[error("step budget exhausted after {steps} steps")]
    StepBudgetExhausted {
        /// Steps executed before the drive stopped.
        steps: u64,
    },
}

/// Every failure of a task run, collapsed into one error value.
///
/// # Example
///
/// ```
/// use deferred::{AggregateFailure, IntoFailures};
///
/// let single = AggregateFailure::from("timeout".into_failures());
/// assert_eq!(single.to_string(), "timeout");
///
/// let several = AggregateFailure::from(vec!["e1", "e2"].into_failures());
/// assert_eq!(several.len(), 2);
/// assert_eq!(several.to_string(), "2 failures: [1] e1; [2] e2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.failures))]
pub struct AggregateFailure {
    failures: Failures,
}

#[allow(clippy::len_without_is_empty)]
impl AggregateFailure {
    /// Returns the wrapped failures, in order.
    #[must_use]
    pub const fn failures(&self) -> &Failures {
        &self.failures
    }

    /// Returns the first failure.
    #[must_use]
    pub fn first(&self) -> &Failure {
        self.failures.first()
    }

    /// Returns the number of wrapped failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Unwraps the failure sequence.
    #[must_use]
    pub fn into_failures(self) -> Failures {
        self.failures
    }
}

impl From<Failures> for AggregateFailure {
    fn from(failures: Failures) -> Self {
        Self { failures }
    }
}

fn describe(failures: &Failures) -> String {
    if failures.is_single() {
        return failures.first().to_string();
    }
    let mut out = format!("{} failures: ", failures.len());
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "[{}] {failure}", i + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::IntoFailures;

    #[test]
    fn task_error_display() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("task_error_display");
        assert_eq!(TaskError::NoTasksToRace.to_string(), "no tasks to race");
        assert_eq!(
            TaskError::StepBudgetExhausted { steps: 3 }.to_string(),
            "step budget exhausted after 3 steps"
        );
        crate::test_complete!("task_error_display");
    }

    #[test]
    fn aggregate_preserves_every_failure() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("aggregate_preserves_every_failure");
        let aggregate = AggregateFailure::from(vec!["a", "b", "c"].into_failures());
        assert_eq!(aggregate.failures().messages(), vec!["a", "b", "c"]);
        assert_eq!(aggregate.first().message(), "a");
        let back = aggregate.into_failures();
        assert_eq!(back.len(), 3);
        crate::test_complete!("aggregate_preserves_every_failure");
    }
}
