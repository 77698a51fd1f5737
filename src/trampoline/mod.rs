//! Stack-safe execution of recursive programs.
//!
//! A recursive algorithm written as a [`Program`] returns its next step
//! instead of recursing: `Program::suspend(move || next(n - 1))`. A driver
//! consumes the resulting chain in a loop, so its depth is bounded by memory,
//! not by the call stack.
//!
//! - [`Program::run_sync`] drives a synchronous program on the current thread.
//! - [`run_async`] drives an [`AsyncProgram`], awaiting every step.
//! - [`Trampoline`] and [`AsyncTrampoline`] wrap a recursive function and guard
//!   it against overlapping drive loops.
//!
//! Drive limits come from [`DriveConfig`](crate::DriveConfig).

mod drive;
mod program;
mod wrap;

pub use drive::{run_async, run_async_with};
pub use program::{AsyncProgram, Program};
pub use wrap::{AsyncTrampoline, Trampoline};
