//! Concurrent collection with failure accumulation.
//!
//! # Semantics
//!
//! - Every task is started in the first poll of the combined run.
//! - The combined run settles only after every branch settled.
//! - If every branch succeeded, the values are returned in input order,
//!   regardless of completion order.
//! - Otherwise the failure sequences of the failed branches are flattened in
//!   input order. Successful branches contribute nothing.
//! - An empty input succeeds with an empty vector.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::failure::Failures;
use crate::task::{Branch, Task, TaskResult};
use crate::tracing_compat::debug;

impl<T: Send + 'static> Task<T> {
    /// Runs every task concurrently and collects their values in input order.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::Task;
    /// use futures_lite::future::block_on;
    ///
    /// let ok = Task::all([Task::resolved(1), Task::resolved(2)]);
    /// assert_eq!(block_on(ok.execute()), Ok(vec![1, 2]));
    ///
    /// let failed = Task::all([
    ///     Task::rejected("a"),
    ///     Task::resolved(2),
    ///     Task::rejected(vec!["b", "c"]),
    /// ]);
    /// let failures = block_on(failed.execute()).unwrap_err();
    /// assert_eq!(failures.messages(), vec!["a", "b", "c"]);
    /// ```
    pub fn all<I>(tasks: I) -> Task<Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Arc<[Self]> = tasks.into_iter().collect();
        Task::from_factory(move || {
            Box::pin(All {
                branches: tasks.iter().map(|t| Branch::start(t.execute())).collect(),
            })
        })
    }
}

/// Run future of [`Task::all`].
struct All<T> {
    branches: Vec<Branch<T>>,
}

impl<T> Unpin for All<T> {}

impl<T> Future for All<T> {
    type Output = TaskResult<Vec<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut all_settled = true;
        for branch in &mut self.branches {
            all_settled &= branch.poll_settled(cx);
        }
        if !all_settled {
            return Poll::Pending;
        }

        let mut values = Vec::with_capacity(self.branches.len());
        let mut failures: Option<Failures> = None;
        for branch in &mut self.branches {
            match branch.take().expect("all polled after completion") {
                Ok(value) => values.push(value),
                Err(branch_failures) => match &mut failures {
                    Some(acc) => acc.append(branch_failures),
                    None => failures = Some(branch_failures),
                },
            }
        }
        debug!(
            branches = self.branches.len(),
            failures = failures.as_ref().map_or(0, Failures::len),
            "all settled"
        );
        Poll::Ready(failures.map_or(Ok(values), Err))
    }
}
