//! First-to-settle racing.
//!
//! Every task starts in the first poll of the combined run. The branch that
//! reported first decides the outcome, on either channel, even when several
//! branches report between two polls of the race.
//!
//! Each branch is polled with its own waker. A report wakes the run it
//! settles, so the branch waker stamps the branch with a tick of a clock
//! shared by the whole race. A branch found settled without having been
//! woken settled inside the poll itself and is stamped right then. The
//! settled branch with the smallest stamp wins and is admitted through a
//! [`SettleGuard`]; the losing runs are dropped right after and whatever
//! they report later goes nowhere.
//!
//! Racing nothing is a contract violation reported when the race is built,
//! not a task that never settles.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::Mutex;

use crate::error::TaskError;
use crate::guard::SettleGuard;
use crate::task::{BoxFuture, Branch, Task, TaskResult};
use crate::tracing_compat::trace;

impl<T: Send + 'static> Task<T> {
    /// Runs every task concurrently; the first to settle decides the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NoTasksToRace`] when `tasks` is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use deferred::{Task, TaskError};
    /// use futures_lite::future::block_on;
    ///
    /// let race = Task::race([Task::resolved("fast"), Task::rejected("slow")]).unwrap();
    /// assert_eq!(block_on(race.execute()), Ok("fast"));
    ///
    /// let empty = Task::<u8>::race(Vec::new());
    /// assert_eq!(empty.unwrap_err(), TaskError::NoTasksToRace);
    /// ```
    pub fn race<I>(tasks: I) -> Result<Self, TaskError>
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Arc<[Self]> = tasks.into_iter().collect();
        if tasks.is_empty() {
            return Err(TaskError::NoTasksToRace);
        }
        Ok(Self::from_factory(move || {
            Box::pin(Race::new(tasks.iter().map(Self::execute)))
        }))
    }
}

/// Orders branch settlements within one race run.
struct RaceClock {
    ticks: AtomicU64,
    parent: Mutex<Option<Waker>>,
}

impl RaceClock {
    /// Returns the next tick. Ticks start at 1; 0 means "not woken".
    fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Waker handed to one branch, recording when it was last woken.
struct BranchWaker {
    woken_at: AtomicU64,
    clock: Arc<RaceClock>,
}

impl Wake for BranchWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken_at.store(self.clock.tick(), Ordering::Release);
        let parent = self.clock.parent.lock().clone();
        if let Some(parent) = parent {
            parent.wake();
        }
    }
}

struct Contender<T> {
    branch: Branch<T>,
    stamp: Arc<BranchWaker>,
    waker: Waker,
}

/// Run future of [`Task::race`].
struct Race<T> {
    contenders: Vec<Contender<T>>,
    clock: Arc<RaceClock>,
    guard: SettleGuard,
}

impl<T> Race<T> {
    fn new(runs: impl Iterator<Item = BoxFuture<TaskResult<T>>>) -> Self {
        let clock = Arc::new(RaceClock {
            ticks: AtomicU64::new(0),
            parent: Mutex::new(None),
        });
        let contenders = runs
            .map(|run| {
                let stamp = Arc::new(BranchWaker {
                    woken_at: AtomicU64::new(0),
                    clock: Arc::clone(&clock),
                });
                Contender {
                    branch: Branch::start(run),
                    waker: Waker::from(Arc::clone(&stamp)),
                    stamp,
                }
            })
            .collect();
        Self {
            contenders,
            clock,
            guard: SettleGuard::new(),
        }
    }
}

impl<T> Unpin for Race<T> {}

impl<T> Future for Race<T> {
    type Output = TaskResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        assert!(!self.guard.is_settled(), "race polled after completion");
        {
            let mut parent = self.clock.parent.lock();
            match parent.as_ref() {
                Some(existing) if existing.will_wake(cx.waker()) => {}
                _ => *parent = Some(cx.waker().clone()),
            }
        }

        let this = &mut *self;
        let mut winner: Option<(u64, usize)> = None;
        for (index, contender) in this.contenders.iter_mut().enumerate() {
            let woken_at = contender.stamp.woken_at.swap(0, Ordering::AcqRel);
            let mut branch_cx = Context::from_waker(&contender.waker);
            if !contender.branch.poll_settled(&mut branch_cx) {
                continue;
            }
            let stamp = if woken_at == 0 {
                this.clock.tick()
            } else {
                woken_at
            };
            if winner.is_none_or(|(best, _)| stamp < best) {
                winner = Some((stamp, index));
            }
        }
        let Some((stamp, index)) = winner else {
            return Poll::Pending;
        };

        assert!(this.guard.settle(), "race admitted a second winner");
        let outcome = this.contenders[index]
            .branch
            .take()
            .expect("settled branch holds an outcome");
        trace!(
            winner = index,
            stamp,
            failed = outcome.is_err(),
            "race settled"
        );
        this.contenders.clear();
        Poll::Ready(outcome)
    }
}
