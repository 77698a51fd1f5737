//! Recursive functions wrapped in a drive loop.
//!
//! A wrapped function receives a handle to itself and an argument, and
//! returns a program. Calling the wrapper from outside starts a drive loop
//! that runs the program to completion. Calls made while that loop is in
//! flight, typically the function recursing into itself from a suspended
//! step, are re-entrant: they do not start a second loop. They return the
//! redirect target's program undriven, and the loop already in flight drives
//! it. The redirect target is the fallback if one was given, otherwise the
//! body itself.
//!
//! # Example
//!
//! ```
//! use deferred::{Program, Trampoline};
//!
//! let factorial = Trampoline::new(|this, (n, acc): (u64, u64)| {
//!     if n <= 1 {
//!         Program::done(acc)
//!     } else {
//!         let this = this.clone();
//!         Program::suspend(move || this.call((n - 1, acc * n)))
//!     }
//! });
//! assert_eq!(factorial.invoke((5, 1)), 120);
//! ```

use core::fmt;
use std::sync::Arc;

use super::{AsyncProgram, Program, run_async_with};
use crate::config::DriveConfig;
use crate::failure::capture;
use crate::guard::ReentrancyGuard;
use crate::task::{BoxFuture, TaskResult};
use crate::tracing_compat::trace;

type Body<A, T> = dyn Fn(&Trampoline<A, T>, A) -> Program<T> + Send + Sync;
type AsyncBody<A, T> = dyn Fn(&AsyncTrampoline<A, T>, A) -> AsyncProgram<T> + Send + Sync;

struct Inner<B: ?Sized> {
    guard: ReentrancyGuard,
    fallback: Option<Box<B>>,
    body: Box<B>,
}

impl<B: ?Sized> Inner<B> {
    fn redirect_target(&self) -> &B {
        self.fallback.as_deref().unwrap_or(&*self.body)
    }
}

/// A synchronous recursive function driven in a loop.
pub struct Trampoline<A, T> {
    inner: Arc<Inner<Body<A, T>>>,
}

impl<A, T> Clone for Trampoline<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T> fmt::Debug for Trampoline<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline")
            .field("active", &self.inner.guard.is_active())
            .field("has_fallback", &self.inner.fallback.is_some())
            .finish()
    }
}

impl<A: Send + 'static, T: Send + 'static> Trampoline<A, T> {
    /// Wraps `body`. Re-entrant calls are redirected to `body` itself.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Self, A) -> Program<T> + Send + Sync + 'static,
    {
        Self::build(Box::new(body), None)
    }

    /// Wraps `body`, redirecting re-entrant calls to `fallback`.
    pub fn with_fallback<F, G>(body: F, fallback: G) -> Self
    where
        F: Fn(&Self, A) -> Program<T> + Send + Sync + 'static,
        G: Fn(&Self, A) -> Program<T> + Send + Sync + 'static,
    {
        Self::build(Box::new(body), Some(Box::new(fallback)))
    }

    fn build(body: Box<Body<A, T>>, fallback: Option<Box<Body<A, T>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                guard: ReentrancyGuard::new(),
                fallback,
                body,
            }),
        }
    }

    /// Calls the wrapped function.
    ///
    /// Outside a drive loop this runs the body to completion and returns a
    /// finished program. Inside one it returns the redirect target's program
    /// for the running loop to drive.
    pub fn call(&self, arg: A) -> Program<T> {
        match self.inner.guard.enter() {
            Some(_scope) => Program::Done((self.inner.body)(self, arg).run_sync()),
            None => {
                trace!("re-entrant trampoline call redirected");
                (self.inner.redirect_target())(self, arg)
            }
        }
    }

    /// Calls the wrapped function and returns its result.
    pub fn invoke(&self, arg: A) -> T {
        self.call(arg).run_sync()
    }

    /// Returns true while a drive loop of this function is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.guard.is_active()
    }
}

/// An asynchronous recursive function driven in a loop.
///
/// Works like [`Trampoline`], except the body returns an [`AsyncProgram`]
/// and the drive loop awaits each step. The guard stays held across those
/// awaits, so a call arriving from another run while a drive is in flight is
/// redirected as well.
pub struct AsyncTrampoline<A, T> {
    inner: Arc<Inner<AsyncBody<A, T>>>,
    config: DriveConfig,
}

impl<A, T> Clone for AsyncTrampoline<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config,
        }
    }
}

impl<A, T> fmt::Debug for AsyncTrampoline<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTrampoline")
            .field("active", &self.inner.guard.is_active())
            .field("has_fallback", &self.inner.fallback.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<A: Send + 'static, T: Send + 'static> AsyncTrampoline<A, T> {
    /// Wraps `body`. Re-entrant calls are redirected to `body` itself.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Self, A) -> AsyncProgram<T> + Send + Sync + 'static,
    {
        Self::build(Box::new(body), None)
    }

    /// Wraps `body`, redirecting re-entrant calls to `fallback`.
    pub fn with_fallback<F, G>(body: F, fallback: G) -> Self
    where
        F: Fn(&Self, A) -> AsyncProgram<T> + Send + Sync + 'static,
        G: Fn(&Self, A) -> AsyncProgram<T> + Send + Sync + 'static,
    {
        Self::build(Box::new(body), Some(Box::new(fallback)))
    }

    fn build(body: Box<AsyncBody<A, T>>, fallback: Option<Box<AsyncBody<A, T>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                guard: ReentrancyGuard::new(),
                fallback,
                body,
            }),
            config: DriveConfig::default(),
        }
    }

    /// Replaces the limits applied to drive loops of this function.
    #[must_use]
    pub fn config(mut self, config: DriveConfig) -> Self {
        self.config = config;
        self
    }

    /// Calls the wrapped function.
    ///
    /// The returned program has one step. When that step runs outside a
    /// drive loop of this function, it drives the body to completion;
    /// inside one, it resolves to the redirect target's program.
    pub fn call(&self, arg: A) -> AsyncProgram<T> {
        let this = self.clone();
        AsyncProgram::suspend_future(move || this.step(arg))
    }

    async fn step(self, arg: A) -> TaskResult<AsyncProgram<T>> {
        if let Some(_scope) = self.inner.guard.enter() {
            let program = capture(|| (self.inner.body)(&self, arg))?;
            let value = run_async_with(program, self.config).await?;
            return Ok(AsyncProgram::Done(value));
        }
        trace!("re-entrant async trampoline call redirected");
        capture(|| (self.inner.redirect_target())(&self, arg))
    }

    /// Calls the wrapped function and drives it to completion.
    pub fn invoke(&self, arg: A) -> BoxFuture<TaskResult<T>> {
        Box::pin(run_async_with(self.call(arg), self.config))
    }

    /// Returns true while a drive loop of this function is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.guard.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn countdown(this: &Trampoline<u64, u64>, n: u64) -> Program<u64> {
        if n == 0 {
            Program::done(0)
        } else {
            let this = this.clone();
            Program::suspend(move || this.call(n - 1))
        }
    }

    #[test]
    fn deep_recursion_runs_in_one_loop() {
        init_test("deep_recursion_runs_in_one_loop");
        let trampoline = Trampoline::new(countdown);
        assert_eq!(trampoline.invoke(100_000), 0);
        assert!(!trampoline.is_active());
        crate::test_complete!("deep_recursion_runs_in_one_loop");
    }

    #[test]
    fn reentrant_calls_go_to_fallback() {
        init_test("reentrant_calls_go_to_fallback");
        let redirected = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redirected);
        let trampoline = Trampoline::with_fallback(countdown, move |this, n| {
            counter.fetch_add(1, Ordering::SeqCst);
            countdown(this, n)
        });
        assert_eq!(trampoline.invoke(10), 0);
        let count = redirected.load(Ordering::SeqCst);
        crate::assert_with_log!(count == 10, "redirected calls", 10, count);

        assert_eq!(trampoline.invoke(3), 0);
        assert_eq!(redirected.load(Ordering::SeqCst), 13);
        crate::test_complete!("reentrant_calls_go_to_fallback");
    }

    #[test]
    fn guard_is_released_after_panicking_body() {
        init_test("guard_is_released_after_panicking_body");
        let trampoline = Trampoline::new(|_this, fail: bool| {
            assert!(!fail, "body refused");
            Program::done(1_u8)
        });
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            trampoline.invoke(true)
        }));
        assert!(unwound.is_err());
        assert!(!trampoline.is_active());
        assert_eq!(trampoline.invoke(false), 1);
        crate::test_complete!("guard_is_released_after_panicking_body");
    }

    fn async_countdown(this: &AsyncTrampoline<u64, u64>, n: u64) -> AsyncProgram<u64> {
        if n == 0 {
            AsyncProgram::done(0)
        } else {
            let this = this.clone();
            AsyncProgram::suspend(move || this.call(n - 1))
        }
    }

    #[test]
    fn async_recursion_is_stack_safe() {
        init_test("async_recursion_is_stack_safe");
        let trampoline = AsyncTrampoline::new(async_countdown);
        assert_eq!(block_on(trampoline.invoke(100_000)), Ok(0));
        assert!(!trampoline.is_active());
        crate::test_complete!("async_recursion_is_stack_safe");
    }

    #[test]
    fn async_reentrant_calls_go_to_fallback() {
        init_test("async_reentrant_calls_go_to_fallback");
        let redirected = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redirected);
        let trampoline = AsyncTrampoline::with_fallback(async_countdown, move |this, n| {
            counter.fetch_add(1, Ordering::SeqCst);
            async_countdown(this, n)
        });
        assert_eq!(block_on(trampoline.invoke(25)), Ok(0));
        assert_eq!(redirected.load(Ordering::SeqCst), 25);
        crate::test_complete!("async_reentrant_calls_go_to_fallback");
    }

    #[test]
    fn async_body_panic_is_a_failure() {
        init_test("async_body_panic_is_a_failure");
        let trampoline: AsyncTrampoline<(), u8> =
            AsyncTrampoline::new(|_this, ()| panic!("async body refused"));
        let failures = block_on(trampoline.invoke(())).expect_err("body panics");
        assert!(failures.first().is_panic());
        assert!(!trampoline.is_active());
        crate::test_complete!("async_body_panic_is_a_failure");
    }

    #[test]
    fn async_budget_applies_to_inner_drive() {
        init_test("async_budget_applies_to_inner_drive");
        let trampoline =
            AsyncTrampoline::new(async_countdown).config(DriveConfig::default().max_steps(50));
        let failures = block_on(trampoline.invoke(1_000)).expect_err("over budget");
        assert_eq!(failures.first().kind(), crate::FailureKind::Engine);
        crate::test_complete!("async_budget_applies_to_inner_drive");
    }
}
