//! Two-case programs consumed by the drivers.

use core::fmt;

use crate::config::DriveConfig;
use crate::error::TaskError;
use crate::failure::IntoFailures;
use crate::task::bridge::Bridged;
use crate::task::{BoxFuture, Task, TaskResult};
use crate::tracing_compat::warn;

type Thunk<T> = Box<dyn FnOnce() -> Program<T> + Send>;
type AsyncThunk<T> = Box<dyn FnOnce() -> BoxFuture<TaskResult<AsyncProgram<T>>> + Send>;

/// A synchronous program: a finished value or one more step to run.
///
/// # Example
///
/// ```
/// use deferred::Program;
///
/// fn count_down(n: u64) -> Program<u64> {
///     if n == 0 {
///         Program::done(0)
///     } else {
///         Program::suspend(move || count_down(n - 1))
///     }
/// }
///
/// assert_eq!(count_down(1_000_000).run_sync(), 0);
/// ```
pub enum Program<T> {
    /// The drive is over.
    Done(T),
    /// Running the thunk yields the next program.
    Suspend(Thunk<T>),
}

impl<T> fmt::Debug for Program<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(_) => f.write_str("Program::Done(..)"),
            Self::Suspend(_) => f.write_str("Program::Suspend(..)"),
        }
    }
}

impl<T: Send + 'static> Program<T> {
    /// A finished program.
    pub const fn done(value: T) -> Self {
        Self::Done(value)
    }

    /// Defers the rest of the program to `thunk`.
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::Suspend(Box::new(thunk))
    }

    /// Returns true for `Done`.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Runs a single step. `Done` is returned unchanged.
    #[must_use]
    pub fn step(self) -> Self {
        match self {
            Self::Suspend(thunk) => thunk(),
            done @ Self::Done(_) => done,
        }
    }

    /// Transforms the final value once the program finishes.
    pub fn map<U, F>(self, f: F) -> Program<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Done(value) => Program::Done(f(value)),
            Self::Suspend(thunk) => Program::suspend(move || thunk().map(f)),
        }
    }

    /// Drives the program to completion on the current thread.
    ///
    /// Steps run in a loop, so the stack does not grow with the number of
    /// suspensions.
    ///
    /// A program whose result is itself a program, such as
    /// `Done(Suspend(..))` or `Done(Done(..))`, is a `Program<Program<T>>`.
    /// Call [`Program::flatten`] first to drive the inner program in the
    /// same loop:
    ///
    /// ```
    /// use deferred::Program;
    ///
    /// let nested = Program::done(Program::suspend(|| Program::done(7)));
    /// assert_eq!(nested.flatten().run_sync(), 7);
    /// ```
    pub fn run_sync(self) -> T {
        let mut program = self;
        loop {
            match program {
                Self::Done(value) => return value,
                Self::Suspend(thunk) => program = thunk(),
            }
        }
    }

    /// Drives the program under the limits of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::StepBudgetExhausted`] when the program needs more
    /// steps than the configured budget.
    pub fn run_sync_with(self, config: &DriveConfig) -> Result<T, TaskError> {
        let mut program = self;
        let mut steps: u64 = 0;
        loop {
            match program {
                Self::Done(value) => return Ok(value),
                Self::Suspend(thunk) => {
                    if config.budget_exhausted(steps) {
                        warn!(steps, "synchronous drive ran out of step budget");
                        return Err(TaskError::StepBudgetExhausted { steps });
                    }
                    program = thunk();
                    steps += 1;
                }
            }
        }
    }
}

impl<T: Send + 'static> Program<Program<T>> {
    /// Removes one level of nesting: the outer program is driven, then the
    /// inner program continues in the same drive.
    pub fn flatten(self) -> Program<T> {
        match self {
            Self::Done(inner) => inner,
            Self::Suspend(thunk) => Program::suspend(move || thunk().flatten()),
        }
    }
}

/// A program whose steps may await.
///
/// A step is a future resolving to the next program, or to failures that end
/// the drive.
pub enum AsyncProgram<T> {
    /// The drive is over.
    Done(T),
    /// Awaiting the future built by the thunk yields the next program.
    Suspend(AsyncThunk<T>),
}

impl<T> fmt::Debug for AsyncProgram<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(_) => f.write_str("AsyncProgram::Done(..)"),
            Self::Suspend(_) => f.write_str("AsyncProgram::Suspend(..)"),
        }
    }
}

impl<T: Send + 'static> AsyncProgram<T> {
    /// A finished program.
    pub const fn done(value: T) -> Self {
        Self::Done(value)
    }

    /// Defers the rest of the program to a synchronous thunk.
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::Suspend(Box::new(move || Box::pin(std::future::ready(Ok(thunk())))))
    }

    /// Defers the rest of the program to a future.
    ///
    /// An `Err` from the future ends the drive with the normalized failures.
    pub fn suspend_future<F, Fut, E>(thunk: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Self, E>> + Send + 'static,
        E: IntoFailures,
    {
        Self::Suspend(Box::new(move || Box::pin(Bridged::new(thunk()))))
    }

    /// Defers the rest of the program to one run of `task`.
    pub fn suspend_task(task: Task<Self>) -> Self {
        Self::Suspend(Box::new(move || task.execute()))
    }

    /// Returns true for `Done`.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

impl<T: Send + 'static> From<Program<T>> for AsyncProgram<T> {
    fn from(program: Program<T>) -> Self {
        match program {
            Program::Done(value) => Self::Done(value),
            Program::Suspend(thunk) => Self::suspend(move || thunk().into()),
        }
    }
}
