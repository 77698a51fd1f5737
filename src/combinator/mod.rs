//! Combinators over collections of tasks.
//!
//! - [`Task::all`]: run every task concurrently, collect every value or
//!   every failure
//! - [`Task::race`]: run every task concurrently, the first to settle wins
//! - [`Task::sequence`] / [`Task::traverse`]: run one task at a time,
//!   stopping at the first failure
//! - [`pipe_k`]: compose task-returning functions left to right
//!
//! Concurrency here means fan-out polling: a combinator's run future polls
//! every branch from its own `poll`, so no thread or executor task is
//! spawned. Branches that report from other threads wake the shared run.
//!
//! [`Task::all`]: crate::Task::all
//! [`Task::race`]: crate::Task::race
//! [`Task::sequence`]: crate::Task::sequence
//! [`Task::traverse`]: crate::Task::traverse

mod all;
pub mod kleisli;
mod race;
mod sequence;

pub use kleisli::{Kleisli, KleisliFn, pipe_k};
