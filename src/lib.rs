//! Deferred: lazy, re-runnable two-channel tasks and stack-safe trampolines.
//!
//! # Overview
//!
//! A [`Task`] describes an asynchronous computation that ends on one of two
//! channels: success with a value, or failure with an ordered, non-empty
//! sequence of [`Failure`]s. Tasks are cold. Building and composing them runs
//! nothing; every run executes the computation afresh.
//!
//! # Core Guarantees
//!
//! - **Settle once**: the first report of a run wins, later reports are ignored
//! - **Fail fast where sequential**: `chain`, `sequence` and `traverse` stop at
//!   the first failure
//! - **Accumulate where parallel**: `ap` and `all` wait for every branch and
//!   keep every failure, in branch order
//! - **No raised errors**: panics inside computations and handlers become
//!   failures
//! - **Stack safety**: trampolined recursion runs in a loop, sync or async
//!
//! # Module Structure
//!
//! - [`task`]: the `Task` type, its algebra and its bridges
//! - [`combinator`]: `all`, `race`, `sequence`, `traverse`, Kleisli pipelines
//! - [`failure`]: failure normalization
//! - [`error`](mod@error): engine errors and the aggregate exit error
//! - [`guard`]: settle-once and reentrancy guards
//! - [`either`]: the `Either` sum type
//! - [`trampoline`]: `Program`, `AsyncProgram` and their drivers
//! - [`config`]: drive loop limits
//! - [`tracing_compat`]: optional tracing integration (requires
//!   `tracing-integration` feature)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod config;
pub mod either;
pub mod error;
pub mod failure;
pub mod guard;
pub mod task;
pub mod tracing_compat;
pub mod trampoline;

mod util;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use combinator::{Kleisli, KleisliFn, pipe_k};
pub use config::{ConfigError, DriveConfig};
pub use either::Either;
pub use error::{AggregateFailure, TaskError};
pub use failure::{Failure, FailureKind, Failures, IntoFailures};
pub use guard::{ReentrancyGuard, SettleGuard};
pub use task::{BoxFuture, Fail, Succeed, Task, TaskResult};
pub use trampoline::{
    AsyncProgram, AsyncTrampoline, Program, Trampoline, run_async, run_async_with,
};
