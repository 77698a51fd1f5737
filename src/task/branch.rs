//! One branch of a fan-out combinator.

use std::task::{Context, Poll};

use super::{BoxFuture, TaskResult};

/// A run being polled alongside its siblings, and its outcome once settled.
pub(crate) enum Branch<T> {
    Running(BoxFuture<TaskResult<T>>),
    Settled(TaskResult<T>),
    Taken,
}

impl<T> Branch<T> {
    pub(crate) fn start(run: BoxFuture<TaskResult<T>>) -> Self {
        Self::Running(run)
    }

    /// Polls a running branch. Returns true once the branch has settled.
    pub(crate) fn poll_settled(&mut self, cx: &mut Context<'_>) -> bool {
        if let Self::Running(run) = self {
            match run.as_mut().poll(cx) {
                Poll::Ready(outcome) => *self = Self::Settled(outcome),
                Poll::Pending => return false,
            }
        }
        true
    }

    /// Takes the settled outcome, leaving the branch empty.
    pub(crate) fn take(&mut self) -> Option<TaskResult<T>> {
        match std::mem::replace(self, Self::Taken) {
            Self::Settled(outcome) => Some(outcome),
            other => {
                *self = other;
                None
            }
        }
    }
}
