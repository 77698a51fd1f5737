//! Cold, re-runnable two-channel tasks.
//!
//! A [`Task`] wraps exactly one *computation*: a closure receiving a
//! failure reporter ([`Fail`]) and a success reporter ([`Succeed`]) that must
//! eventually call one of them. Constructing a task performs no work. Every
//! run executes the computation afresh with its own [`SettleGuard`], so the
//! first report wins and every later report on that run is discarded.
//!
//! # Running
//!
//! A run is a future. It can be obtained in three ways:
//!
//! - [`Task::execute`] (or `task.await` through [`IntoFuture`]) yields
//!   `Result<T, Failures>`.
//! - [`Task::run`] invokes exactly one of two callbacks.
//! - [`Task::to_future`] collapses failures into an [`AggregateFailure`].
//!
//! The computation starts on the first poll of the run future, so building
//! a run without polling it is still cold.
//!
//! # Example
//!
//! ```
//! use deferred::Task;
//! use futures_lite::future::block_on;
//!
//! let task = Task::new(|_fail, succeed| {
//!     succeed.report(20);
//! })
//! .map(|n| n + 1)
//! .chain(|n| Task::resolved(n * 2));
//!
//! assert_eq!(block_on(task.execute()), Ok(42));
//! // Cold: every run executes the computation again.
//! assert_eq!(block_on(task.execute()), Ok(42));
//! ```
//!
//! [`AggregateFailure`]: crate::AggregateFailure

pub mod algebra;
mod branch;
pub mod bridge;

pub(crate) use branch::Branch;

use core::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::failure::{Failures, IntoFailures, capture};
use crate::guard::SettleGuard;
use crate::tracing_compat::trace;

/// A boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// The outcome of one task run.
pub type TaskResult<T> = Result<T, Failures>;

type Factory<T> = dyn Fn() -> BoxFuture<TaskResult<T>> + Send + Sync;
type Computation<T> = dyn Fn(Fail, Succeed<T>) + Send + Sync;

/// A lazy, re-runnable asynchronous computation with a failure channel and a
/// success channel.
///
/// Cloning is cheap and yields a task running the same computation.
#[must_use = "tasks are cold and do nothing until run"]
pub struct Task<T> {
    factory: Arc<Factory<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Task<T> {
    /// Wraps a computation.
    ///
    /// The computation receives a failure reporter and a success reporter and
    /// must eventually call one of them, possibly from another thread. A
    /// panic inside the computation body settles the run as a failure.
    pub fn new<C>(computation: C) -> Self
    where
        C: Fn(Fail, Succeed<T>) + Send + Sync + 'static,
    {
        let computation: Arc<Computation<T>> = Arc::new(computation);
        Self::from_factory(move || Box::pin(Settling::new(Arc::clone(&computation))))
    }

    /// A task that immediately succeeds with a clone of `value` on every run.
    pub fn resolved(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_factory(move || Box::pin(std::future::ready(Ok(value.clone()))))
    }

    /// A task that immediately fails on every run.
    ///
    /// The failure is normalized once, at construction.
    pub fn rejected(failure: impl IntoFailures) -> Self {
        let failures = failure.into_failures();
        Self::from_factory(move || Box::pin(std::future::ready(Err(failures.clone()))))
    }

    pub(crate) fn from_factory<F>(factory: F) -> Self
    where
        F: Fn() -> BoxFuture<TaskResult<T>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Starts a new run. The computation executes on the first poll.
    pub fn execute(&self) -> BoxFuture<TaskResult<T>> {
        (self.factory)()
    }

    /// Runs the task, invoking exactly one of the callbacks once the run
    /// settles.
    pub fn run<OF, OS>(&self, on_failure: OF, on_success: OS) -> BoxFuture<()>
    where
        OF: FnOnce(Failures) + Send + 'static,
        OS: FnOnce(T) + Send + 'static,
    {
        let run = self.execute();
        Box::pin(async move {
            match run.await {
                Ok(value) => on_success(value),
                Err(failures) => on_failure(failures),
            }
        })
    }
}

impl<T: Send + 'static> IntoFuture for Task<T> {
    type Output = TaskResult<T>;
    type IntoFuture = BoxFuture<TaskResult<T>>;

    fn into_future(self) -> Self::IntoFuture {
        self.execute()
    }
}

/// Shared state of one run of a [`Task::new`] computation.
struct Settlement<T> {
    guard: SettleGuard,
    slot: Mutex<Slot<T>>,
}

struct Slot<T> {
    outcome: Option<TaskResult<T>>,
    waker: Option<Waker>,
    delivered: bool,
}

impl<T> Settlement<T> {
    fn new() -> Self {
        Self {
            guard: SettleGuard::new(),
            slot: Mutex::new(Slot {
                outcome: None,
                waker: None,
                delivered: false,
            }),
        }
    }

    fn settle(&self, outcome: TaskResult<T>) -> bool {
        if !self.guard.settle() {
            trace!(
                failed = outcome.is_err(),
                "ignoring report on an already settled run"
            );
            return false;
        }
        let waker = {
            let mut slot = self.slot.lock();
            slot.outcome = Some(outcome);
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<TaskResult<T>> {
        let mut slot = self.slot.lock();
        if let Some(outcome) = slot.outcome.take() {
            slot.delivered = true;
            return Poll::Ready(outcome);
        }
        assert!(!slot.delivered, "task run polled after completion");
        match &slot.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            _ => slot.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

trait FailureSink: Send + Sync {
    fn reject(&self, failures: Failures) -> bool;
    fn is_settled(&self) -> bool;
}

impl<T: Send> FailureSink for Settlement<T> {
    fn reject(&self, failures: Failures) -> bool {
        self.settle(Err(failures))
    }

    fn is_settled(&self) -> bool {
        self.guard.is_settled()
    }
}

/// The failure reporter handed to a computation.
///
/// Clones report into the same run. Only the first report of a run (on
/// either reporter) takes effect.
#[derive(Clone)]
pub struct Fail {
    sink: Arc<dyn FailureSink>,
}

impl Fail {
    /// Reports a failure. Returns true if this call settled the run.
    pub fn report(&self, failure: impl IntoFailures) -> bool {
        self.sink.reject(failure.into_failures())
    }

    /// Returns true once the run has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.sink.is_settled()
    }
}

impl fmt::Debug for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fail")
            .field("settled", &self.sink.is_settled())
            .finish()
    }
}

/// The success reporter handed to a computation.
pub struct Succeed<T> {
    settlement: Arc<Settlement<T>>,
}

impl<T> Clone for Succeed<T> {
    fn clone(&self) -> Self {
        Self {
            settlement: Arc::clone(&self.settlement),
        }
    }
}

impl<T> Succeed<T> {
    /// Reports success. Returns true if this call settled the run.
    pub fn report(&self, value: T) -> bool {
        self.settlement.settle(Ok(value))
    }

    /// Returns true once the run has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settlement.guard.is_settled()
    }
}

impl<T> fmt::Debug for Succeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Succeed")
            .field("settled", &self.settlement.guard.is_settled())
            .finish()
    }
}

/// Run future of a [`Task::new`] computation.
struct Settling<T> {
    computation: Option<Arc<Computation<T>>>,
    settlement: Arc<Settlement<T>>,
}

impl<T> Settling<T> {
    fn new(computation: Arc<Computation<T>>) -> Self {
        Self {
            computation: Some(computation),
            settlement: Arc::new(Settlement::new()),
        }
    }
}

impl<T: Send + 'static> Future for Settling<T> {
    type Output = TaskResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(computation) = self.computation.take() {
            let fail = Fail {
                sink: Arc::clone(&self.settlement) as Arc<dyn FailureSink>,
            };
            let succeed = Succeed {
                settlement: Arc::clone(&self.settlement),
            };
            if let Err(failures) = capture(move || computation(fail, succeed)) {
                self.settlement.settle(Err(failures));
            }
        }
        self.settlement.poll_outcome(cx)
    }
}
