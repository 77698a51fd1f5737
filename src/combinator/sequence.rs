//! Sequential collection.
//!
//! Tasks run one at a time in input order; a task is not started until the
//! previous one succeeded. The first failure settles the combined run and
//! the remaining tasks never start.

use std::sync::Arc;

use crate::failure::capture;
use crate::task::Task;

impl<T: Send + 'static> Task<T> {
    /// Runs the tasks one after another, collecting their values.
    ///
    /// An empty input succeeds with an empty vector.
    pub fn sequence<I>(tasks: I) -> Task<Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Arc<[Self]> = tasks.into_iter().collect();
        Task::from_factory(move || {
            let tasks = Arc::clone(&tasks);
            Box::pin(async move {
                let mut values = Vec::with_capacity(tasks.len());
                for task in tasks.iter() {
                    values.push(task.execute().await?);
                }
                Ok(values)
            })
        })
    }

    /// Maps every item to a task and runs those tasks in sequence.
    ///
    /// `f` is called lazily, right before its task runs, so items after a
    /// failure are never mapped.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::Task;
    /// use futures_lite::future::block_on;
    ///
    /// let doubled = Task::traverse(vec![1, 2, 3], |n| Task::resolved(n * 2));
    /// assert_eq!(block_on(doubled.execute()), Ok(vec![2, 4, 6]));
    /// ```
    pub fn traverse<A, F>(items: impl IntoIterator<Item = A>, f: F) -> Task<Vec<T>>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A) -> Self + Send + Sync + 'static,
    {
        let items: Arc<[A]> = items.into_iter().collect();
        let f = Arc::new(f);
        Task::from_factory(move || {
            let items = Arc::clone(&items);
            let f = Arc::clone(&f);
            Box::pin(async move {
                let mut values = Vec::with_capacity(items.len());
                for item in items.iter() {
                    let item = item.clone();
                    let task = capture(|| f(item))?;
                    values.push(task.execute().await?);
                }
                Ok(values)
            })
        })
    }
}
