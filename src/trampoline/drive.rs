//! The asynchronous driver.

use std::sync::Arc;

use super::AsyncProgram;
use crate::config::DriveConfig;
use crate::error::TaskError;
use crate::failure::{IntoFailures, capture};
use crate::task::{Task, TaskResult};
use crate::tracing_compat::warn;
use crate::util::yield_now;

/// Drives an asynchronous program to completion with the default
/// [`DriveConfig`].
///
/// # Errors
///
/// Returns the failures of the first step that failed. A panic inside a
/// thunk or while polling a step is reported as a failure.
pub async fn run_async<T: Send + 'static>(program: AsyncProgram<T>) -> TaskResult<T> {
    run_async_with(program, DriveConfig::default()).await
}

/// Drives an asynchronous program under the limits of `config`.
///
/// Steps are awaited one at a time in a loop. Every `yield_every` steps the
/// driver yields to the executor once, so a long run of steps that resolve
/// immediately does not starve other work.
///
/// # Errors
///
/// Returns the failures of the first failing step, or an engine failure
/// wrapping [`TaskError::StepBudgetExhausted`] when the budget runs out.
pub async fn run_async_with<T: Send + 'static>(
    program: AsyncProgram<T>,
    config: DriveConfig,
) -> TaskResult<T> {
    let mut program = program;
    let mut steps: u64 = 0;
    loop {
        match program {
            AsyncProgram::Done(value) => return Ok(value),
            AsyncProgram::Suspend(thunk) => {
                if config.budget_exhausted(steps) {
                    warn!(steps, "asynchronous drive ran out of step budget");
                    return Err(TaskError::StepBudgetExhausted { steps }.into_failures());
                }
                let step = capture(thunk)?;
                program = step.await?;
                steps += 1;
                if config.should_yield(steps) {
                    yield_now().await;
                }
            }
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// Lifts an asynchronous program into a cold task.
    ///
    /// `factory` builds a fresh program on every run, right before it is
    /// driven.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::{AsyncProgram, Task};
    /// use futures_lite::future::block_on;
    ///
    /// fn count(n: u32, acc: u32) -> AsyncProgram<u32> {
    ///     if n == 0 {
    ///         AsyncProgram::done(acc)
    ///     } else {
    ///         AsyncProgram::suspend(move || count(n - 1, acc + 1))
    ///     }
    /// }
    ///
    /// let task = Task::from_program(|| count(50_000, 0));
    /// assert_eq!(block_on(task.execute()), Ok(50_000));
    /// ```
    pub fn from_program<F>(factory: F) -> Self
    where
        F: Fn() -> AsyncProgram<T> + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        Self::from_factory(move || {
            let factory = Arc::clone(&factory);
            Box::pin(async move {
                let program = capture(|| factory())?;
                run_async(program).await
            })
        })
    }
}
