//! Left-to-right composition of task-returning functions.
//!
//! A [`Kleisli`] arrow is a function `A -> Task<B>`. Composing arrows runs
//! them one after another: each step starts only after the previous step
//! succeeded and receives its value. The first failure short-circuits the
//! remaining steps, exactly like [`Task::chain`].

use core::fmt;
use std::sync::Arc;

use crate::failure::capture;
use crate::task::Task;

/// A boxed task-returning step, as accepted by [`pipe_k`].
pub type KleisliFn<T, U> = Box<dyn Fn(T) -> Task<U> + Send + Sync>;

type Step<A, B> = dyn Fn(A) -> Task<B> + Send + Sync;

/// A composable function from `A` to `Task<B>`.
///
/// # Example
///
/// ```
/// use deferred::{Kleisli, Task};
/// use futures_lite::future::block_on;
///
/// let parse = Kleisli::new(|raw: String| Task::from_result(raw.parse::<i64>()
///     .map_err(|e| e.to_string())));
/// let double = parse.then(|n| Task::resolved(n * 2));
///
/// assert_eq!(block_on(double.apply(String::from("21")).execute()), Ok(42));
/// ```
pub struct Kleisli<A, B> {
    step: Arc<Step<A, B>>,
}

impl<A, B> Clone for Kleisli<A, B> {
    fn clone(&self) -> Self {
        Self {
            step: Arc::clone(&self.step),
        }
    }
}

impl<A, B> fmt::Debug for Kleisli<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kleisli").finish_non_exhaustive()
    }
}

impl<A: 'static, B: Send + 'static> Kleisli<A, B> {
    /// Wraps a task-returning function.
    pub fn new<F>(step: F) -> Self
    where
        F: Fn(A) -> Task<B> + Send + Sync + 'static,
    {
        Self {
            step: Arc::new(step),
        }
    }

    /// Builds the task for `input`.
    ///
    /// A panic in the step is reported as a rejected task.
    pub fn apply(&self, input: A) -> Task<B> {
        capture(|| (self.step)(input)).unwrap_or_else(Task::rejected)
    }

    /// Appends a step running after this one.
    pub fn then<C, F>(&self, next: F) -> Kleisli<A, C>
    where
        C: Send + 'static,
        F: Fn(B) -> Task<C> + Send + Sync + 'static,
    {
        let first = self.clone();
        let next = Arc::new(next);
        Kleisli::new(move |input| {
            let next = Arc::clone(&next);
            first.apply(input).chain(move |value| next(value))
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Kleisli<T, T> {
    /// The arrow that succeeds with its input.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Task::resolved)
    }
}

/// Composes homogeneous steps left to right.
///
/// With no steps the seed is lifted unchanged into a successful task.
///
/// # Example
///
/// ```
/// use deferred::{KleisliFn, Task, pipe_k};
/// use futures_lite::future::block_on;
///
/// let steps: Vec<KleisliFn<i32, i32>> = vec![
///     Box::new(|n| Task::resolved(n + 1)),
///     Box::new(|n| Task::resolved(n * 10)),
/// ];
/// let pipeline = pipe_k(steps);
/// assert_eq!(block_on(pipeline.apply(4).execute()), Ok(50));
///
/// let empty = pipe_k(Vec::<KleisliFn<i32, i32>>::new());
/// assert_eq!(block_on(empty.apply(7).execute()), Ok(7));
/// ```
pub fn pipe_k<T, I>(steps: I) -> Kleisli<T, T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = KleisliFn<T, T>>,
{
    let steps: Arc<[KleisliFn<T, T>]> = steps.into_iter().collect();
    Kleisli::new(move |seed: T| {
        let steps = Arc::clone(&steps);
        Task::from_factory(move || {
            let steps = Arc::clone(&steps);
            let seed = seed.clone();
            Box::pin(async move {
                let mut value = seed;
                for step in steps.iter() {
                    let next = capture(|| step(value))?;
                    value = next.execute().await?;
                }
                Ok(value)
            })
        })
    })
}
