//! Stack safety and reentrancy of the trampoline drivers.

mod common;

use common::{init_test_logging, test_complete, test_phase};
use deferred::{
    AsyncProgram, AsyncTrampoline, DriveConfig, FailureKind, Program, Task, TaskError,
    Trampoline, run_async, run_async_with,
};
use futures_lite::future::block_on;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEEP: u64 = 100_000;

fn countdown(n: u64) -> Program<u64> {
    if n == 0 {
        Program::done(0)
    } else {
        Program::suspend(move || countdown(n - 1))
    }
}

fn factorial(n: u64, acc: u64) -> Program<u64> {
    if n <= 1 {
        Program::done(acc)
    } else {
        Program::suspend(move || factorial(n - 1, acc * n))
    }
}

fn naive_factorial(n: u64) -> u64 {
    if n <= 1 { 1 } else { n * naive_factorial(n - 1) }
}

fn async_sum(n: u64, acc: u64) -> AsyncProgram<u64> {
    if n == 0 {
        AsyncProgram::done(acc)
    } else {
        let step = Task::resolved(n).map(move |k| async_sum(k - 1, acc + k));
        AsyncProgram::suspend_task(step)
    }
}

#[test]
fn sync_countdown_survives_deep_recursion() {
    init_test_logging();
    test_phase("sync_countdown_survives_deep_recursion");
    assert_eq!(countdown(DEEP).run_sync(), 0);
    test_complete("sync_countdown_survives_deep_recursion");
}

#[test]
fn factorial_matches_naive_definition() {
    init_test_logging();
    test_phase("factorial_matches_naive_definition");
    for n in 0..=20 {
        assert_eq!(factorial(n, 1).run_sync(), naive_factorial(n), "factorial({n})");
    }
    assert_eq!(factorial(5, 1).run_sync(), 120);
    test_complete("factorial_matches_naive_definition");
}

#[test]
fn async_countdown_survives_deep_recursion() {
    init_test_logging();
    test_phase("async_countdown_survives_deep_recursion");
    assert_eq!(block_on(run_async(countdown(DEEP).into())), Ok(0));
    assert_eq!(block_on(run_async(async_sum(DEEP, 0))), Ok(DEEP * (DEEP + 1) / 2));
    test_complete("async_countdown_survives_deep_recursion");
}

#[test]
fn wrapped_functions_redirect_reentrant_calls() {
    init_test_logging();
    test_phase("wrapped_functions_redirect_reentrant_calls");
    let redirected = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redirected);
    let body = |this: &Trampoline<u64, u64>, n: u64| {
        if n == 0 {
            Program::done(0)
        } else {
            let this = this.clone();
            Program::suspend(move || this.call(n - 1))
        }
    };
    let wrapped = Trampoline::with_fallback(body, move |this, n| {
        counter.fetch_add(1, Ordering::SeqCst);
        body(this, n)
    });
    assert_eq!(wrapped.invoke(DEEP), 0);
    assert_eq!(redirected.load(Ordering::SeqCst), DEEP as usize);
    assert!(!wrapped.is_active());

    let async_wrapped = AsyncTrampoline::new(|this, n: u64| {
        if n == 0 {
            AsyncProgram::done(0_u64)
        } else {
            let this = this.clone();
            AsyncProgram::suspend(move || this.call(n - 1))
        }
    });
    assert_eq!(block_on(async_wrapped.invoke(DEEP)), Ok(0));
    test_complete("wrapped_functions_redirect_reentrant_calls");
}

#[test]
fn step_budgets_stop_runaway_programs() {
    init_test_logging();
    test_phase("step_budgets_stop_runaway_programs");
    let config = DriveConfig::default().max_steps(1_000);
    assert_eq!(
        countdown(DEEP).run_sync_with(&config),
        Err(TaskError::StepBudgetExhausted { steps: 1_000 })
    );
    let failures = block_on(run_async_with(countdown(DEEP).into(), config))
        .expect_err("async drive over budget");
    assert_eq!(failures.first().kind(), FailureKind::Engine);
    assert_eq!(countdown(999).run_sync_with(&config), Ok(0));
    test_complete("step_budgets_stop_runaway_programs");
}
