//! Conversions between [`Task`] and the ordinary Rust carriers of a
//! two-channel outcome: futures, `Result` and [`Either`].
//!
//! Futures entering a task are polled through [`Bridged`], which normalizes
//! the error side and turns a panic raised while polling into a failure.
//! Tasks leaving as a future collapse their failure sequence into one
//! [`AggregateFailure`] so every individual failure stays readable.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;

use super::{BoxFuture, Task, TaskResult};
use crate::either::Either;
use crate::error::AggregateFailure;
use crate::failure::{Failure, Failures, IntoFailures};

/// Polls a fallible future on behalf of a task run.
#[pin_project]
pub(crate) struct Bridged<Fut> {
    #[pin]
    inner: Fut,
}

impl<Fut> Bridged<Fut> {
    pub(crate) const fn new(inner: Fut) -> Self {
        Self { inner }
    }
}

impl<Fut, T, E> Future for Bridged<Fut>
where
    Fut: Future<Output = Result<T, E>>,
    E: IntoFailures,
{
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.project().inner;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Ready(outcome)) => Poll::Ready(outcome.map_err(IntoFailures::into_failures)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(Failures::single(Failure::from_panic(
                payload.as_ref(),
            )))),
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// Wraps a future factory as a task.
    ///
    /// `factory` is called once per run, so every run awaits a fresh future.
    /// `Ok` settles the success channel; `Err` is normalized into the failure
    /// channel.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::{Failure, Task};
    /// use futures_lite::future::block_on;
    ///
    /// let task = Task::from_future(|| async { "42".parse::<u32>().map_err(Failure::from_error) });
    /// assert_eq!(block_on(task.execute()), Ok(42));
    /// ```
    pub fn from_future<Fut, E, F>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: IntoFailures,
    {
        Self::from_factory(move || Box::pin(Bridged::new(factory())))
    }

    /// Lifts an already computed `Result`.
    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        T: Clone + Sync,
        E: IntoFailures,
    {
        match result {
            Ok(value) => Self::resolved(value),
            Err(failure) => Self::rejected(failure),
        }
    }

    /// Lifts an [`Either`], `Left` being the failure side.
    pub fn from_either<L>(either: Either<L, T>) -> Self
    where
        T: Clone + Sync,
        L: IntoFailures,
    {
        Self::from_result(either.into_result())
    }

    /// Runs the task as a future resolving to a plain `Result`.
    ///
    /// The failure sequence collapses into one [`AggregateFailure`].
    pub fn to_future(&self) -> BoxFuture<Result<T, AggregateFailure>> {
        let run = self.execute();
        Box::pin(async move { run.await.map_err(AggregateFailure::from) })
    }

    /// A task that always succeeds, carrying the outcome as an [`Either`].
    pub fn to_either(&self) -> Task<Either<Failures, T>> {
        self.fold(Either::Left, Either::Right)
    }
}
