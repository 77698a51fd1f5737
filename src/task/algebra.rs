//! Functor, monad and applicative operations on [`Task`].
//!
//! # Semantics
//!
//! | Operation | On success | On failure |
//! |-----------|------------|------------|
//! | `map` | transform value | pass through |
//! | `try_map` | transform, `Err` joins failure channel | pass through |
//! | `map_failure` | pass through | transform each failure |
//! | `chain` | run the returned task | pass through, callback never runs |
//! | `fold` | recover into success | recover into success |
//! | `ap` | apply once both branches settle | concatenate branch failures |
//!
//! A panic raised inside any user handler is caught and reported on the
//! failure channel, so a failing transform cannot be told apart from a
//! failing computation. `map_failure` is the exception: a panicking failure
//! mapper keeps the original failure.
//!
//! # Fail-fast versus accumulation
//!
//! `chain` is sequential and fail-fast. `ap` starts both branches in the same
//! poll and waits for both, then reports the concatenation of their failures
//! with the function branch first. Reimplementing `ap` as fail-fast would
//! lose the second branch's failures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::{Branch, Task, TaskResult};
use crate::failure::{Failure, Failures, IntoFailures, capture};
use crate::tracing_compat::{debug, trace};

impl<T: Send + 'static> Task<T> {
    /// Transforms the success value.
    pub fn map<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let parent = self.clone();
        let f = Arc::new(f);
        Task::from_factory(move || {
            let run = parent.execute();
            let f = Arc::clone(&f);
            Box::pin(async move {
                let value = run.await?;
                capture(move || f(value))
            })
        })
    }

    /// Transforms the success value with a fallible function.
    ///
    /// An `Err` is normalized into the failure channel.
    pub fn try_map<U, E, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        E: IntoFailures,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        let parent = self.clone();
        let f = Arc::new(f);
        Task::from_factory(move || {
            let run = parent.execute();
            let f = Arc::clone(&f);
            Box::pin(async move {
                let value = run.await?;
                capture(move || f(value))?.map_err(IntoFailures::into_failures)
            })
        })
    }

    /// Transforms each failure independently.
    ///
    /// If `f` panics for some failure, that failure is kept unchanged.
    pub fn map_failure<F>(&self, f: F) -> Self
    where
        F: Fn(Failure) -> Failure + Send + Sync + 'static,
    {
        let parent = self.clone();
        let f = Arc::new(f);
        Task::from_factory(move || {
            let run = parent.execute();
            let f = Arc::clone(&f);
            Box::pin(async move {
                run.await.map_err(|failures| {
                    failures.map_each(|failure| {
                        let original = failure.clone();
                        capture(|| f(failure)).unwrap_or_else(|_| {
                            trace!(
                                failure = %original,
                                "failure mapper panicked, keeping original"
                            );
                            original
                        })
                    })
                })
            })
        })
    }

    /// Sequential composition: on success, runs the task returned by `f`.
    ///
    /// If this task fails, `f` is never called and the failures pass through
    /// unchanged.
    pub fn chain<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Task<U> + Send + Sync + 'static,
    {
        let parent = self.clone();
        let f = Arc::new(f);
        Task::from_factory(move || {
            let run = parent.execute();
            let f = Arc::clone(&f);
            Box::pin(async move {
                let value = run.await?;
                let next = capture(move || f(value))?;
                next.execute().await
            })
        })
    }

    /// Folds both channels into the success channel.
    pub fn fold<U, OF, OS>(&self, on_failure: OF, on_success: OS) -> Task<U>
    where
        U: Send + 'static,
        OF: Fn(Failures) -> U + Send + Sync + 'static,
        OS: Fn(T) -> U + Send + Sync + 'static,
    {
        let parent = self.clone();
        let handlers = Arc::new((on_failure, on_success));
        Task::from_factory(move || {
            let run = parent.execute();
            let handlers = Arc::clone(&handlers);
            Box::pin(async move {
                match run.await {
                    Ok(value) => capture(move || (handlers.1)(value)),
                    Err(failures) => capture(move || (handlers.0)(failures)),
                }
            })
        })
    }
}

impl<F: Send + 'static> Task<F> {
    /// Applies the function produced by this task to the value produced by
    /// `value`, running both concurrently.
    ///
    /// Both branches always settle before the result is decided. If either
    /// failed, the failures of both branches are reported, function branch
    /// first; the function is applied only when both succeeded.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::Task;
    /// use futures_lite::future::block_on;
    ///
    /// let f: Task<fn(i32) -> i32> = Task::rejected("e1");
    /// let x: Task<i32> = Task::rejected("e2");
    /// let failures = block_on(f.ap(&x).execute()).unwrap_err();
    /// assert_eq!(failures.messages(), vec!["e1", "e2"]);
    /// ```
    pub fn ap<T, U>(&self, value: &Task<T>) -> Task<U>
    where
        F: FnOnce(T) -> U,
        T: Send + 'static,
        U: Send + 'static,
    {
        let func = self.clone();
        let value = value.clone();
        Task::from_factory(move || {
            Box::pin(Ap {
                func: Branch::start(func.execute()),
                value: Branch::start(value.execute()),
            })
        })
    }
}

/// Run future of [`Task::ap`].
struct Ap<F, T> {
    func: Branch<F>,
    value: Branch<T>,
}

impl<F, T> Unpin for Ap<F, T> {}

impl<F, T, U> Future for Ap<F, T>
where
    F: FnOnce(T) -> U,
{
    type Output = TaskResult<U>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let func_settled = this.func.poll_settled(cx);
        let value_settled = this.value.poll_settled(cx);
        if !(func_settled && value_settled) {
            return Poll::Pending;
        }

        let (Some(func), Some(value)) = (this.func.take(), this.value.take()) else {
            panic!("ap polled after completion");
        };
        let outcome = match (func, value) {
            (Ok(f), Ok(v)) => capture(move || f(v)),
            (Err(func_failures), Err(value_failures)) => {
                Err(func_failures.concat(value_failures))
            }
            (Err(failures), Ok(_)) | (Ok(_), Err(failures)) => Err(failures),
        };
        debug!(
            failures = outcome.as_ref().err().map_or(0, Failures::len),
            "ap settled"
        );
        Poll::Ready(outcome)
    }
}
