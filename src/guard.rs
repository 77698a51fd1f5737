//! Single-writer-wins guards.
//!
//! Both guards are a boolean flag flipped with one compare-and-swap; neither
//! needs a lock.
//!
//! - [`SettleGuard`] lives for one task run and admits exactly one terminal
//!   outcome. Reporters consult it before storing a result.
//! - [`ReentrancyGuard`] lives for one wrapped recursive function and marks a
//!   drive loop as in flight, so re-entrant calls can be redirected instead
//!   of starting an overlapping loop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Admits the first settlement of a run and rejects every later one.
#[derive(Debug, Default)]
pub struct SettleGuard {
    settled: AtomicBool,
}

impl SettleGuard {
    /// Creates an unsettled guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            settled: AtomicBool::new(false),
        }
    }

    /// Attempts to settle. Returns true only for the first caller.
    pub fn settle(&self) -> bool {
        self.settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns true once some caller has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// Marks a drive loop of one wrapped function as in flight.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    active: AtomicBool,
}

impl ReentrancyGuard {
    /// Creates an inactive guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Enters the guarded section, or returns `None` if it is already active.
    ///
    /// The section stays active until the returned scope is dropped, including
    /// when the drive loop unwinds.
    #[must_use]
    pub fn enter(&self) -> Option<ActiveScope<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActiveScope { guard: self })
    }

    /// Returns true while a drive loop is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// RAII scope returned by [`ReentrancyGuard::enter`].
#[derive(Debug)]
pub struct ActiveScope<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for ActiveScope<'_> {
    fn drop(&mut self) {
        self.guard.active.store(false, Ordering::Release);
    }
}
