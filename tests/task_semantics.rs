//! End-to-end semantics of tasks and their combinators.

mod common;

use common::{init_test_logging, test_complete, test_phase};
use deferred::test_utils::ManualTask;
use deferred::{AggregateFailure, Either, Failures, Task, TaskError};
use futures_lite::future::{block_on, yield_now, zip};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Observed {
    failures: AtomicUsize,
    successes: AtomicUsize,
}

impl Observed {
    fn total(&self) -> usize {
        self.failures.load(Ordering::SeqCst) + self.successes.load(Ordering::SeqCst)
    }
}

fn observe<T: Send + 'static>(task: &Task<T>) -> Arc<Observed> {
    let observed = Arc::new(Observed::default());
    let (on_failure, on_success) = (Arc::clone(&observed), Arc::clone(&observed));
    block_on(task.run(
        move |_| {
            on_failure.failures.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            on_success.successes.fetch_add(1, Ordering::SeqCst);
        },
    ));
    observed
}

fn noisy(value: i32) -> Task<i32> {
    Task::new(move |fail, succeed| {
        succeed.report(value);
        succeed.report(value + 1);
        fail.report("late failure");
    })
}

fn never_settles() -> Task<i32> {
    Task::new(|_fail, _succeed| {})
}

#[test]
fn settle_once_across_combinators() {
    init_test_logging();
    test_phase("settle_once_across_combinators");
    let f: Task<fn(i32) -> i32> = Task::resolved(|n| n * 2);
    let composed = [
        noisy(1),
        noisy(1).map(|n| n + 1),
        noisy(2).chain(noisy),
        f.ap(&noisy(3)),
        Task::all([noisy(1), noisy(2)]).map(|values| values.iter().sum()),
        Task::race([noisy(4), noisy(5)]).expect("non-empty race"),
        Task::sequence([noisy(1), Task::rejected("stop"), noisy(3)]).map(|v| v.len() as i32),
    ];
    for task in &composed {
        let observed = observe(task);
        assert_eq!(observed.total(), 1, "exactly one reporter invocation");
    }
    test_complete("settle_once_across_combinators");
}

#[test]
fn chain_never_invokes_callback_after_failure() {
    init_test_logging();
    test_phase("chain_never_invokes_callback_after_failure");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let failing: Task<i32> = Task::rejected(vec!["first", "second"]);
    let chained = failing.chain(move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        Task::resolved(n)
    });
    let failures = block_on(chained.execute()).expect_err("chain propagates failure");
    let original = block_on(failing.execute()).expect_err("source fails");
    assert_eq!(failures, original);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    test_complete("chain_never_invokes_callback_after_failure");
}

#[test]
fn ap_accumulates_and_never_succeeds_on_partial_failure() {
    init_test_logging();
    test_phase("ap_accumulates_and_never_succeeds_on_partial_failure");
    let f: Task<fn(i32) -> i32> = Task::rejected("e1");
    let x: Task<i32> = Task::rejected("e2");
    let failures = block_on(f.ap(&x).execute()).expect_err("both branches fail");
    assert_eq!(failures.messages(), vec!["e1", "e2"]);

    let g: Task<fn(i32) -> i32> = Task::resolved(|n| n);
    let failures = block_on(g.ap(&x).execute()).expect_err("value branch fails");
    assert_eq!(failures.messages(), vec!["e2"]);
    test_complete("ap_accumulates_and_never_succeeds_on_partial_failure");
}

#[test]
fn all_collects_without_short_circuit() {
    init_test_logging();
    test_phase("all_collects_without_short_circuit");
    let started = Arc::new(AtomicUsize::new(0));
    let counted = |value: i32| {
        let started = Arc::clone(&started);
        Task::new(move |_fail, succeed| {
            started.fetch_add(1, Ordering::SeqCst);
            succeed.report(value);
        })
    };
    let mixed = Task::all([counted(1), Task::rejected("x"), counted(3)]);
    let failures = block_on(mixed.execute()).expect_err("one branch fails");
    assert_eq!(failures.messages(), vec!["x"]);
    assert_eq!(started.load(Ordering::SeqCst), 2, "later branches still ran");

    let first = ManualTask::<i32>::new();
    let second = ManualTask::<i32>::new();
    let run = Task::all([first.task(), second.task()]).execute();
    let (outcome, ()) = block_on(zip(run, async {
        yield_now().await;
        assert!(second.succeed(2));
        yield_now().await;
        assert!(first.succeed(1));
    }));
    assert_eq!(outcome, Ok(vec![1, 2]));
    test_complete("all_collects_without_short_circuit");
}

#[test]
fn race_takes_first_observed_settlement() {
    init_test_logging();
    test_phase("race_takes_first_observed_settlement");
    let race = Task::race([never_settles(), Task::resolved(5)]).expect("non-empty race");
    assert_eq!(block_on(race.execute()), Ok(5));

    let empty = Task::<i32>::race(Vec::new());
    assert_eq!(empty.unwrap_err(), TaskError::NoTasksToRace);
    assert_eq!(TaskError::NoTasksToRace.to_string(), "no tasks to race");

    let left = ManualTask::<&'static str>::new();
    let right = ManualTask::<&'static str>::new();
    let race = Task::race([left.task(), right.task()]).expect("non-empty race");
    let (outcome, ()) = block_on(zip(race.execute(), async {
        yield_now().await;
        assert!(right.succeed("right"));
        yield_now().await;
        assert!(left.succeed("left"), "the losing run still settles on its own");
    }));
    assert_eq!(outcome, Ok("right"));
    test_complete("race_takes_first_observed_settlement");
}

#[test]
fn race_orders_reports_made_between_polls() {
    init_test_logging();
    test_phase("race_orders_reports_made_between_polls");
    let left = ManualTask::<&'static str>::new();
    let right = ManualTask::<&'static str>::new();
    let race = Task::race([left.task().map(|s| s), right.task()]).expect("non-empty race");
    let (outcome, ()) = block_on(zip(race.execute(), async {
        yield_now().await;
        assert!(right.succeed("right"));
        assert!(left.succeed("left"));
    }));
    assert_eq!(outcome, Ok("right"), "only the earliest report's payload appears");

    let left = ManualTask::<&'static str>::new();
    let right = ManualTask::<&'static str>::new();
    let race = Task::race([left.task(), right.task()]).expect("non-empty race");
    let (outcome, ()) = block_on(zip(race.execute(), async {
        yield_now().await;
        let (left, right) = (left.clone(), right.clone());
        std::thread::spawn(move || {
            assert!(right.fail("right failed"));
            assert!(left.succeed("left"));
        })
        .join()
        .expect("reporter thread panicked");
    }));
    let failures = outcome.expect_err("the failure was reported first");
    assert_eq!(failures.messages(), vec!["right failed"]);
    test_complete("race_orders_reports_made_between_polls");
}

#[test]
fn either_and_future_bridges_round_trip() {
    init_test_logging();
    test_phase("either_and_future_bridges_round_trip");
    let right = Task::from_either(Either::<&str, _>::Right(8));
    assert_eq!(block_on(right.to_either().execute()), Ok(Either::Right(8)));

    let left = Task::<i32>::from_either(Either::Left("e"));
    let outcome = block_on(left.to_either().execute()).expect("to_either never fails");
    let failures: Failures = outcome.left().expect("left side");
    assert_eq!(failures.messages(), vec!["e"]);

    let single: Task<i32> = Task::rejected("only one");
    let aggregate: AggregateFailure = block_on(single.to_future()).expect_err("rejects");
    assert_eq!(aggregate.len(), 1);
    assert_eq!(aggregate.first().message(), "only one");
    assert_eq!(aggregate.to_string(), "only one");
    test_complete("either_and_future_bridges_round_trip");
}

#[test]
fn tasks_are_rerunnable() {
    init_test_logging();
    test_phase("tasks_are_rerunnable");
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let task = Task::new(move |_fail, succeed| {
        succeed.report(counter.fetch_add(1, Ordering::SeqCst));
    })
    .map(|n| n * 10);
    assert_eq!(block_on(task.execute()), Ok(0));
    assert_eq!(block_on(task.clone().execute()), Ok(10));
    assert_eq!(block_on(async { task.await }), Ok(20));
    test_complete("tasks_are_rerunnable");
}
